use crate::config::PointsSettings;
use crate::domain::deposit::{DepositStatus, PaymentMethod, RefundReason, UserDeposit};
use crate::domain::money::Amount;
use crate::domain::payment::{
    NoShowSettlement, PaymentRequest, PaymentResponse, RefundRequest, RefundResponse,
};
use crate::domain::points::UserPoints;
use crate::domain::policy::{RefundCalculation, RefundPolicy, RefundScenario};
use crate::domain::ports::{DepositStoreBox, PaymentGatewayBox, PointsLedgerBox};
use crate::error::{DepositError, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

pub const INSUFFICIENT_POINTS_MESSAGE: &str = "포인트가 부족합니다.";

/// Settles meetup deposits.
///
/// `DepositService` evaluates the refund policy and drives the injected
/// collaborators: deposit storage, the points ledger and the payment
/// gateway. Every operation re-reads the deposit, checks that the status
/// transition is allowed, performs the money movement and only then
/// persists the new status. A failed refund leaves the deposit `paid`.
pub struct DepositService {
    policy: RefundPolicy,
    points: PointsSettings,
    deposits: DepositStoreBox,
    ledger: PointsLedgerBox,
    gateway: PaymentGatewayBox,
}

impl DepositService {
    /// Creates a new `DepositService`.
    ///
    /// # Arguments
    ///
    /// * `policy` - The refund policy table.
    /// * `points` - Point expiry settings for credited points.
    /// * `deposits` - The store for deposit records.
    /// * `ledger` - The points ledger.
    /// * `gateway` - The payment gateway used for card and KakaoPay deposits.
    pub fn new(
        policy: RefundPolicy,
        points: PointsSettings,
        deposits: DepositStoreBox,
        ledger: PointsLedgerBox,
        gateway: PaymentGatewayBox,
    ) -> Self {
        Self {
            policy,
            points,
            deposits,
            ledger,
            gateway,
        }
    }

    pub fn calculate_refund_amount(
        &self,
        deposit: &UserDeposit,
        scenario: RefundScenario,
        hours_before_meetup: Option<Decimal>,
    ) -> Result<RefundCalculation> {
        self.policy
            .calculate_refund_amount(deposit, scenario, hours_before_meetup)
    }

    pub async fn get_user_points(&self, user_id: &str) -> Result<UserPoints> {
        self.ledger.get_user_points(user_id).await
    }

    pub async fn deposit(&self, deposit_id: &str) -> Result<Option<UserDeposit>> {
        self.deposits.get(deposit_id).await
    }

    pub async fn deposits_for_meetup(&self, meetup_id: &str) -> Result<Vec<UserDeposit>> {
        self.deposits.list_by_meetup(meetup_id).await
    }

    pub async fn all_deposits(&self) -> Result<Vec<UserDeposit>> {
        self.deposits.get_all().await
    }

    pub async fn all_balances(&self) -> Result<Vec<UserPoints>> {
        self.ledger.all_balances().await
    }

    /// Collects a deposit for a meetup.
    ///
    /// Payment failures (declines, unreachable gateway, not enough points)
    /// are reported through the returned `PaymentResponse` and leave the
    /// deposit `failed`. A response carrying a redirect URL leaves the
    /// deposit `pending` until `confirm_payment` is called.
    pub async fn pay_deposit(
        &self,
        deposit_id: &str,
        request: PaymentRequest,
    ) -> Result<(UserDeposit, PaymentResponse)> {
        if self.deposits.get(deposit_id).await?.is_some() {
            return Err(DepositError::Conflict(format!(
                "deposit {} already exists",
                deposit_id
            )));
        }

        let mut deposit = UserDeposit::new(
            deposit_id,
            request.user_id.clone(),
            request.meetup_id.clone(),
            request.amount,
            request.method,
        );

        let response = match request.method {
            PaymentMethod::Points => self.pay_with_points(&mut deposit).await?,
            PaymentMethod::Card | PaymentMethod::KakaoPay => {
                self.pay_with_gateway(&mut deposit, &request).await?
            }
        };

        self.deposits.store(deposit.clone()).await?;
        Ok((deposit, response))
    }

    async fn pay_with_points(&self, deposit: &mut UserDeposit) -> Result<PaymentResponse> {
        let balance = self.ledger.get_user_points(&deposit.user_id).await?;
        if !balance.has_available(deposit.amount) {
            tracing::warn!(
                deposit_id = %deposit.id,
                user_id = %deposit.user_id,
                available = %balance.available_points,
                requested = %deposit.amount,
                "not enough points for deposit"
            );
            deposit.transition(DepositStatus::Failed)?;
            return Ok(PaymentResponse::declined(INSUFFICIENT_POINTS_MESSAGE));
        }

        let description = format!("약속금 결제 ({})", deposit.meetup_id);
        match self
            .ledger
            .deduct_points(&deposit.user_id, deposit.amount, &description)
            .await
        {
            Ok(()) => {}
            Err(DepositError::InsufficientPoints { .. }) => {
                deposit.transition(DepositStatus::Failed)?;
                return Ok(PaymentResponse::declined(INSUFFICIENT_POINTS_MESSAGE));
            }
            Err(e) => return Err(e),
        }

        let payment_id = format!("points:{}", deposit.id);
        deposit.mark_paid(Some(payment_id.clone()))?;
        tracing::info!(deposit_id = %deposit.id, user_id = %deposit.user_id, "deposit paid with points");
        Ok(PaymentResponse::approved(payment_id))
    }

    async fn pay_with_gateway(
        &self,
        deposit: &mut UserDeposit,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse> {
        let response = match self.gateway.pay_deposit(request).await {
            Ok(response) => response,
            Err(DepositError::GatewayError(message)) => {
                tracing::warn!(deposit_id = %deposit.id, %message, "payment gateway unavailable");
                PaymentResponse::declined(message)
            }
            Err(e) => return Err(e),
        };

        if !response.success {
            tracing::warn!(
                deposit_id = %deposit.id,
                error = response.error_message.as_deref().unwrap_or_default(),
                "deposit payment declined"
            );
            deposit.transition(DepositStatus::Failed)?;
        } else if response.redirect_url.is_some() {
            deposit.payment_id = response.payment_id.clone();
            tracing::info!(deposit_id = %deposit.id, "deposit awaiting external payment");
        } else {
            deposit.mark_paid(response.payment_id.clone())?;
            tracing::info!(deposit_id = %deposit.id, user_id = %deposit.user_id, "deposit paid");
        }
        Ok(response)
    }

    /// Completes a deposit whose payment finished on an external page.
    pub async fn confirm_payment(&self, deposit_id: &str, payment_id: &str) -> Result<UserDeposit> {
        let mut deposit = self.load(deposit_id).await?;
        deposit.mark_paid(Some(payment_id.to_string()))?;
        self.deposits.store(deposit.clone()).await?;
        tracing::info!(deposit_id, "external deposit payment confirmed");
        Ok(deposit)
    }

    /// Refunds an attended-with-review deposit in full.
    pub async fn process_auto_refund(&self, deposit_id: &str) -> Result<RefundResponse> {
        let deposit = self.load_settleable(deposit_id, DepositStatus::Refunded).await?;
        let calc = self.policy.calculate_refund_amount(
            &deposit,
            RefundScenario::NormalAttendanceWithReview,
            None,
        )?;
        self.refund(deposit, DepositStatus::Refunded, calc).await
    }

    /// Turns an attended-without-review deposit into points.
    ///
    /// The returned `refund_amount` is the number of points credited.
    pub async fn convert_to_points(&self, deposit_id: &str) -> Result<RefundResponse> {
        let mut deposit = self.load_settleable(deposit_id, DepositStatus::Converted).await?;
        let points = self.policy.conversion_points(deposit.amount);

        if points > Decimal::ZERO {
            self.ledger
                .add_points(
                    &deposit.user_id,
                    Amount::new(points)?,
                    "약속금 포인트 전환",
                    Some(&deposit.id),
                    self.point_expiry(),
                )
                .await?;
        }

        deposit.settle(DepositStatus::Converted, points, RefundReason::NormalAttendance)?;
        self.deposits.store(deposit.clone()).await?;
        tracing::info!(deposit_id, user_id = %deposit.user_id, %points, "deposit converted to points");
        Ok(RefundResponse::settled(points, RefundReason::NormalAttendance))
    }

    /// Forfeits the deposits of `no_show_user_ids` and shares them out
    /// equally among `attendee_user_ids`.
    ///
    /// Shares are rounded down to whole points; the remainder is reported
    /// as `undistributed`. Nothing happens when there are no attendees.
    ///
    /// Totals and shares are computed before any deposit changes, so a
    /// validation failure leaves the meetup untouched. The writes after
    /// that are not atomic: a ledger failure while crediting leaves the
    /// deposits forfeited and the remaining attendees uncredited. The
    /// failure is logged with the number of attendees still owed.
    pub async fn process_no_show_penalty(
        &self,
        meetup_id: &str,
        no_show_user_ids: &[String],
        attendee_user_ids: &[String],
    ) -> Result<NoShowSettlement> {
        let mut settlement = NoShowSettlement::empty(meetup_id);
        if attendee_user_ids.is_empty() {
            tracing::debug!(meetup_id, "no attendees, skipping no-show settlement");
            return Ok(settlement);
        }

        let mut forfeitable: Vec<UserDeposit> = Vec::new();
        for user_id in no_show_user_ids {
            let Some(deposit) = self
                .deposits
                .find_by_user_and_meetup(user_id, meetup_id)
                .await?
            else {
                tracing::warn!(meetup_id, %user_id, "no deposit for no-show user");
                continue;
            };
            if deposit.status != DepositStatus::Paid {
                tracing::debug!(meetup_id, %user_id, status = %deposit.status, "skipping unpaid deposit");
                continue;
            }
            if forfeitable.iter().any(|d| d.id == deposit.id) {
                continue;
            }
            let calc = self
                .policy
                .calculate_refund_amount(&deposit, RefundScenario::NoShow, None)?;
            settlement.forfeited_total = settlement
                .forfeited_total
                .checked_add(deposit.amount.value() - calc.refund_amount)
                .ok_or_else(|| overflow(meetup_id))?;
            forfeitable.push(deposit);
        }

        let attendees = Decimal::from(attendee_user_ids.len());
        let share = if self.policy.no_show.redistribute_to_attendees {
            let per_attendee = (settlement.forfeited_total / attendees).floor();
            let distributed = per_attendee
                .checked_mul(attendees)
                .ok_or_else(|| overflow(meetup_id))?;
            settlement.per_attendee = per_attendee;
            settlement.undistributed = settlement.forfeited_total - distributed;
            if per_attendee > Decimal::ZERO {
                Some(Amount::new(per_attendee)?)
            } else {
                None
            }
        } else {
            settlement.undistributed = settlement.forfeited_total;
            None
        };

        for deposit in forfeitable {
            self.forfeit(deposit).await?;
        }

        if let Some(share) = share {
            let description = format!("노쇼 약속금 분배 ({})", meetup_id);
            for (credited, attendee) in attendee_user_ids.iter().enumerate() {
                if let Err(e) = self
                    .ledger
                    .add_points(attendee, share, &description, None, self.point_expiry())
                    .await
                {
                    tracing::error!(
                        meetup_id,
                        %attendee,
                        uncredited = attendee_user_ids.len() - credited,
                        "Failed to credit no-show share: {}",
                        e
                    );
                    return Err(e);
                }
                settlement.credited_attendees.push(attendee.clone());
            }
        }

        tracing::info!(
            meetup_id,
            forfeited = %settlement.forfeited_total,
            per_attendee = %settlement.per_attendee,
            attendees = attendee_user_ids.len(),
            "no-show deposits settled"
        );
        Ok(settlement)
    }

    /// Settles one deposit according to `request.scenario`.
    ///
    /// Validation and lookup problems are returned as errors. A payment
    /// gateway failure while returning money is reported as
    /// `success: false` and leaves the deposit untouched.
    pub async fn process_refund(&self, request: RefundRequest) -> Result<RefundResponse> {
        match request.scenario {
            RefundScenario::NormalAttendanceWithReview => {
                self.process_auto_refund(&request.deposit_id).await
            }
            RefundScenario::NormalAttendanceWithoutReview => {
                self.convert_to_points(&request.deposit_id).await
            }
            RefundScenario::NoShow => {
                let deposit = self
                    .load_settleable(&request.deposit_id, DepositStatus::Forfeited)
                    .await?;
                let refunded = deposit.amount.value();
                let forfeited = self.forfeit(deposit).await?;
                Ok(RefundResponse::settled(refunded - forfeited, RefundReason::NoShow))
            }
            RefundScenario::Cancellation => {
                let hours = request
                    .hours_before_meetup
                    .ok_or(DepositError::MissingCancellationTiming)?;
                let deposit = self.load(&request.deposit_id).await?;
                let calc = self.policy.calculate_refund_amount(
                    &deposit,
                    RefundScenario::Cancellation,
                    Some(hours),
                )?;
                let target = if calc.refund_amount > Decimal::ZERO {
                    DepositStatus::Refunded
                } else {
                    DepositStatus::Forfeited
                };
                ensure_transition(&deposit, target)?;
                self.refund(deposit, target, calc).await
            }
        }
    }

    async fn refund(
        &self,
        mut deposit: UserDeposit,
        target: DepositStatus,
        calc: RefundCalculation,
    ) -> Result<RefundResponse> {
        match self.return_funds(&deposit, calc.refund_amount).await {
            Ok(()) => {}
            Err(DepositError::GatewayError(message)) => {
                tracing::warn!(deposit_id = %deposit.id, %message, "refund failed");
                return Ok(RefundResponse::failed(message));
            }
            Err(e) => return Err(e),
        }

        deposit.settle(target, calc.refund_amount, calc.reason)?;
        self.deposits.store(deposit.clone()).await?;
        tracing::info!(
            deposit_id = %deposit.id,
            status = %target,
            refund_amount = %calc.refund_amount,
            reason = %calc.reason,
            "deposit settled"
        );
        Ok(RefundResponse::settled(calc.refund_amount, calc.reason))
    }

    /// Marks a paid deposit forfeited and returns the forfeited amount.
    async fn forfeit(&self, mut deposit: UserDeposit) -> Result<Decimal> {
        let calc = self
            .policy
            .calculate_refund_amount(&deposit, RefundScenario::NoShow, None)?;
        self.return_funds(&deposit, calc.refund_amount).await?;

        deposit.settle(DepositStatus::Forfeited, calc.refund_amount, RefundReason::NoShow)?;
        self.deposits.store(deposit.clone()).await?;
        tracing::info!(deposit_id = %deposit.id, user_id = %deposit.user_id, "deposit forfeited");
        Ok(deposit.amount.value() - calc.refund_amount)
    }

    /// Sends `amount` back the way the deposit was paid.
    async fn return_funds(&self, deposit: &UserDeposit, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Ok(());
        }
        let amount = Amount::new(amount)?;

        match deposit.payment_method {
            PaymentMethod::Points => {
                self.ledger
                    .add_points(
                        &deposit.user_id,
                        amount,
                        "약속금 환불",
                        Some(&deposit.id),
                        self.point_expiry(),
                    )
                    .await
            }
            PaymentMethod::Card | PaymentMethod::KakaoPay => {
                let payment_id = deposit.payment_id.as_deref().ok_or_else(|| {
                    DepositError::ValidationError(format!(
                        "deposit {} has no payment id to refund",
                        deposit.id
                    ))
                })?;
                self.gateway.refund(payment_id, amount).await
            }
        }
    }

    async fn load(&self, deposit_id: &str) -> Result<UserDeposit> {
        self.deposits
            .get(deposit_id)
            .await?
            .ok_or_else(|| DepositError::NotFound(deposit_id.to_string()))
    }

    async fn load_settleable(&self, deposit_id: &str, target: DepositStatus) -> Result<UserDeposit> {
        let deposit = self.load(deposit_id).await?;
        ensure_transition(&deposit, target)?;
        Ok(deposit)
    }

    fn point_expiry(&self) -> Option<DateTime<Utc>> {
        match self.points.expiry_days {
            0 => None,
            days => Some(Utc::now() + Duration::days(i64::from(days))),
        }
    }
}

fn overflow(meetup_id: &str) -> DepositError {
    DepositError::ValidationError(format!(
        "no-show settlement of {} overflows",
        meetup_id
    ))
}

/// Checks a settlement is allowed before any money moves.
fn ensure_transition(deposit: &UserDeposit, target: DepositStatus) -> Result<()> {
    if deposit.status.can_transition_to(target) {
        Ok(())
    } else {
        Err(DepositError::InvalidTransition {
            id: deposit.id.clone(),
            from: deposit.status,
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::PointsLedger;
    use crate::infrastructure::in_memory::{InMemoryDepositStore, InMemoryPointsLedger};
    use crate::infrastructure::simulated_gateway::SimulatedPaymentGateway;
    use rust_decimal_macros::dec;

    fn service_with(gateway: SimulatedPaymentGateway) -> (DepositService, InMemoryPointsLedger) {
        let ledger = InMemoryPointsLedger::new();
        let service = DepositService::new(
            RefundPolicy::default(),
            PointsSettings::default(),
            Box::new(InMemoryDepositStore::new()),
            Box::new(ledger.clone()),
            Box::new(gateway),
        );
        (service, ledger)
    }

    fn request(user: &str, meetup: &str, amount: Decimal, method: PaymentMethod) -> PaymentRequest {
        PaymentRequest {
            user_id: user.to_string(),
            meetup_id: meetup.to_string(),
            amount: Amount::new(amount).unwrap(),
            method,
        }
    }

    #[tokio::test]
    async fn test_duplicate_deposit_ids() {
        let (service, _) = service_with(SimulatedPaymentGateway::new());
        service
            .pay_deposit("d1", request("u1", "m1", dec!(3000), PaymentMethod::Card))
            .await
            .unwrap();
        let result = service
            .pay_deposit("d1", request("u1", "m1", dec!(3000), PaymentMethod::Card))
            .await;
        assert!(matches!(result, Err(DepositError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_card_refund_goes_through_gateway() {
        let gateway = SimulatedPaymentGateway::new();
        let (service, ledger) = service_with(gateway.clone());
        let (deposit, response) = service
            .pay_deposit("d1", request("u1", "m1", dec!(3000), PaymentMethod::Card))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(deposit.status, DepositStatus::Paid);

        let refund = service.process_auto_refund("d1").await.unwrap();
        assert!(refund.success);
        assert_eq!(refund.refund_amount, dec!(3000));

        let refunds = gateway.refunds().await;
        assert_eq!(refunds.len(), 1);
        assert_eq!(Some(refunds[0].0.clone()), deposit.payment_id);
        assert!(ledger.transactions("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_points_deposit_refunds_to_points() {
        let gateway = SimulatedPaymentGateway::new();
        let (service, ledger) = service_with(gateway.clone());
        ledger
            .add_points("u1", Amount::new(dec!(5000)).unwrap(), "welcome", None, None)
            .await
            .unwrap();

        service
            .pay_deposit("d1", request("u1", "m1", dec!(3000), PaymentMethod::Points))
            .await
            .unwrap();
        assert_eq!(
            service.get_user_points("u1").await.unwrap().available_points,
            dec!(2000)
        );

        service.process_auto_refund("d1").await.unwrap();
        assert_eq!(
            service.get_user_points("u1").await.unwrap().available_points,
            dec!(5000)
        );
        assert!(gateway.refunds().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refund_keeps_deposit_paid() {
        let gateway = SimulatedPaymentGateway::new();
        let (service, _) = service_with(gateway.clone());
        service
            .pay_deposit("d1", request("u1", "m1", dec!(3000), PaymentMethod::Card))
            .await
            .unwrap();

        gateway.set_unreachable(true);
        let response = service.process_auto_refund("d1").await.unwrap();
        assert!(!response.success);
        assert!(response.error_message.is_some());

        let deposit = service.deposit("d1").await.unwrap().unwrap();
        assert_eq!(deposit.status, DepositStatus::Paid);

        gateway.set_unreachable(false);
        assert!(service.process_auto_refund("d1").await.unwrap().success);
    }

    #[tokio::test]
    async fn test_point_expiry_follows_settings() {
        let (service, ledger) = service_with(SimulatedPaymentGateway::new());
        service
            .pay_deposit("d1", request("u1", "m1", dec!(3000), PaymentMethod::Card))
            .await
            .unwrap();
        service.convert_to_points("d1").await.unwrap();

        let txs = ledger.transactions("u1").await.unwrap();
        let expiry = txs[0].expiry_date.unwrap();
        let days = (expiry - txs[0].created_at).num_days();
        assert!((364..=365).contains(&days));
    }
}
