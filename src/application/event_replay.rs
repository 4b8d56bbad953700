use super::deposit_service::DepositService;
use crate::domain::payment::{NoShowSettlement, PaymentRequest, RefundRequest};
use crate::domain::policy::RefundScenario;
use crate::error::{DepositError, Result};
use crate::interfaces::csv::event_reader::{EventType, MeetupEvent};
use std::collections::HashMap;

/// Feeds a stream of meetup events through a `DepositService`.
///
/// Attendance and no-shows are collected per meetup until a `settle` event
/// for that meetup triggers the no-show redistribution.
pub struct EventReplayer {
    service: DepositService,
    attendees: HashMap<String, Vec<String>>,
    no_shows: HashMap<String, Vec<String>>,
}

impl EventReplayer {
    pub fn new(service: DepositService) -> Self {
        Self {
            service,
            attendees: HashMap::new(),
            no_shows: HashMap::new(),
        }
    }

    pub fn service(&self) -> &DepositService {
        &self.service
    }

    pub fn into_service(self) -> DepositService {
        self.service
    }

    /// Applies one event. Errors leave the replayer usable for later events.
    ///
    /// Required columns per type: `pay` needs deposit, user, meetup, amount
    /// and method; `review`, `attend` need deposit; `cancel` needs deposit
    /// and hours; `noshow` needs user and meetup; `settle` needs meetup.
    pub async fn apply(&mut self, event: MeetupEvent) -> Result<()> {
        let kind = event.r#type;
        match kind {
            EventType::Pay => {
                let deposit_id = MeetupEvent::require(&event.deposit, "deposit", kind)?;
                let request = PaymentRequest {
                    user_id: MeetupEvent::require(&event.user, "user", kind)?.to_string(),
                    meetup_id: MeetupEvent::require(&event.meetup, "meetup", kind)?.to_string(),
                    amount: event.amount.ok_or_else(|| missing("amount", kind))?,
                    method: event.method.ok_or_else(|| missing("method", kind))?,
                };
                self.service.pay_deposit(deposit_id, request).await?;
            }
            EventType::Review | EventType::Attend => {
                let deposit_id = MeetupEvent::require(&event.deposit, "deposit", kind)?;
                let scenario = if kind == EventType::Review {
                    RefundScenario::NormalAttendanceWithReview
                } else {
                    RefundScenario::NormalAttendanceWithoutReview
                };
                let deposit = self
                    .service
                    .deposit(deposit_id)
                    .await?
                    .ok_or_else(|| DepositError::NotFound(deposit_id.to_string()))?;
                self.service
                    .process_refund(RefundRequest {
                        deposit_id: deposit_id.to_string(),
                        scenario,
                        hours_before_meetup: None,
                    })
                    .await?;
                self.attendees
                    .entry(deposit.meetup_id)
                    .or_default()
                    .push(deposit.user_id);
            }
            EventType::Cancel => {
                let deposit_id = MeetupEvent::require(&event.deposit, "deposit", kind)?;
                self.service
                    .process_refund(RefundRequest {
                        deposit_id: deposit_id.to_string(),
                        scenario: RefundScenario::Cancellation,
                        hours_before_meetup: event.hours,
                    })
                    .await?;
            }
            EventType::NoShow => {
                let user = MeetupEvent::require(&event.user, "user", kind)?;
                let meetup = MeetupEvent::require(&event.meetup, "meetup", kind)?;
                self.no_shows
                    .entry(meetup.to_string())
                    .or_default()
                    .push(user.to_string());
            }
            EventType::Settle => {
                let meetup = MeetupEvent::require(&event.meetup, "meetup", kind)?;
                self.settle(meetup).await?;
            }
        }
        Ok(())
    }

    async fn settle(&mut self, meetup_id: &str) -> Result<NoShowSettlement> {
        let no_shows = self.no_shows.remove(meetup_id).unwrap_or_default();
        let attendees = self.attendees.remove(meetup_id).unwrap_or_default();
        self.service
            .process_no_show_penalty(meetup_id, &no_shows, &attendees)
            .await
    }
}

fn missing(name: &str, kind: EventType) -> DepositError {
    DepositError::ValidationError(format!("{:?} event requires `{}`", kind, name))
}
