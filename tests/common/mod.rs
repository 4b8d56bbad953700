#![allow(dead_code)]

use bapal::application::deposit_service::DepositService;
use bapal::config::PointsSettings;
use bapal::domain::deposit::{PaymentMethod, UserDeposit};
use bapal::domain::money::Amount;
use bapal::domain::payment::PaymentRequest;
use bapal::domain::policy::RefundPolicy;
use bapal::infrastructure::in_memory::{InMemoryDepositStore, InMemoryPointsLedger};
use bapal::infrastructure::simulated_gateway::SimulatedPaymentGateway;
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub struct Harness {
    pub service: DepositService,
    pub ledger: InMemoryPointsLedger,
    pub gateway: SimulatedPaymentGateway,
}

pub fn harness() -> Harness {
    harness_with(RefundPolicy::default())
}

pub fn harness_with(policy: RefundPolicy) -> Harness {
    let ledger = InMemoryPointsLedger::new();
    let gateway = SimulatedPaymentGateway::new();
    let service = DepositService::new(
        policy,
        PointsSettings::default(),
        Box::new(InMemoryDepositStore::new()),
        Box::new(ledger.clone()),
        Box::new(gateway.clone()),
    );
    Harness {
        service,
        ledger,
        gateway,
    }
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

pub fn request(user: &str, meetup: &str, value: Decimal, method: PaymentMethod) -> PaymentRequest {
    PaymentRequest {
        user_id: user.to_string(),
        meetup_id: meetup.to_string(),
        amount: amount(value),
        method,
    }
}

/// Pays a card deposit and asserts the gateway approved it.
pub async fn paid_deposit(
    service: &DepositService,
    id: &str,
    user: &str,
    meetup: &str,
    value: Decimal,
) -> UserDeposit {
    let (deposit, response) = service
        .pay_deposit(id, request(user, meetup, value, PaymentMethod::Card))
        .await
        .unwrap();
    assert!(response.success, "payment for {} was declined", id);
    deposit
}

pub fn events_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "type, user, meetup, deposit, amount, method, hours").unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn write_events(path: &Path, rows: &[&str]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "type, user, meetup, deposit, amount, method, hours")?;
    for row in rows {
        writeln!(file, "{}", row)?;
    }
    Ok(())
}
