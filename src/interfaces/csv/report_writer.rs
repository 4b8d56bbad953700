use crate::domain::deposit::UserDeposit;
use crate::domain::points::UserPoints;
use crate::error::Result;
use std::io::Write;

const DEPOSIT_HEADER: [&str; 6] = ["deposit", "user", "meetup", "amount", "status", "refund_amount"];
const POINTS_HEADER: [&str; 4] = ["user", "total", "available", "used"];

/// Writes the settlement report: a deposits table, a blank line, then a
/// points table. Rows are sorted by id so output is deterministic.
pub struct ReportWriter<W: Write> {
    out: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_report(
        &mut self,
        mut deposits: Vec<UserDeposit>,
        mut balances: Vec<UserPoints>,
    ) -> Result<()> {
        deposits.sort_by(|a, b| a.id.cmp(&b.id));
        balances.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut self.out);
            wtr.write_record(DEPOSIT_HEADER)?;
            for d in &deposits {
                wtr.write_record([
                    d.id.clone(),
                    d.user_id.clone(),
                    d.meetup_id.clone(),
                    d.amount.to_string(),
                    d.status.to_string(),
                    d.refund_amount
                        .map(|a| a.normalize().to_string())
                        .unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }

        writeln!(self.out)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.out);
        wtr.write_record(POINTS_HEADER)?;
        for p in &balances {
            wtr.write_record([
                p.user_id.clone(),
                p.total_points.normalize().to_string(),
                p.available_points.normalize().to_string(),
                p.used_points.normalize().to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deposit::{DepositStatus, PaymentMethod, RefundReason};
    use crate::domain::money::Amount;
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_layout() {
        let mut refunded = UserDeposit::new("d2", "u2", "m1", Amount::new(dec!(2000)).unwrap(), PaymentMethod::Card);
        refunded.mark_paid(Some("p".to_string())).unwrap();
        refunded
            .settle(DepositStatus::Refunded, dec!(1200.00), RefundReason::UserCancelled)
            .unwrap();
        let pending = UserDeposit::new("d1", "u1", "m1", Amount::new(dec!(3000)).unwrap(), PaymentMethod::Card);

        let mut points = UserPoints::new("u3");
        points.add(Amount::new(dec!(666)).unwrap()).unwrap();

        let mut buf = Vec::new();
        ReportWriter::new(&mut buf)
            .write_report(vec![refunded, pending], vec![points])
            .unwrap();

        let out = String::from_utf8(buf).unwrap();
        assert_eq!(
            out,
            "deposit,user,meetup,amount,status,refund_amount\n\
             d1,u1,m1,3000,pending,\n\
             d2,u2,m1,2000,refunded,1200\n\
             \n\
             user,total,available,used\n\
             u3,666,666,0\n"
        );
    }

    #[test]
    fn test_empty_report_keeps_headers() {
        let mut buf = Vec::new();
        ReportWriter::new(&mut buf).write_report(vec![], vec![]).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(
            out,
            "deposit,user,meetup,amount,status,refund_amount\n\nuser,total,available,used\n"
        );
    }
}
