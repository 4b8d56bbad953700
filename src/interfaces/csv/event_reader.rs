use crate::domain::deposit::PaymentMethod;
use crate::domain::money::Amount;
use crate::error::{DepositError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A user pays the deposit for a meetup.
    Pay,
    /// A user attended and left a review.
    Review,
    /// A user attended without leaving a review.
    Attend,
    /// A user cancelled `hours` before the meetup.
    Cancel,
    /// A user did not show up.
    NoShow,
    /// The meetup is over: redistribute no-show deposits.
    Settle,
}

/// One row of the events CSV: `type, user, meetup, deposit, amount, method, hours`.
///
/// Which columns are required depends on the event type; see
/// `EventReplayer::apply`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct MeetupEvent {
    pub r#type: EventType,
    pub user: Option<String>,
    pub meetup: Option<String>,
    pub deposit: Option<String>,
    pub amount: Option<Amount>,
    pub method: Option<PaymentMethod>,
    pub hours: Option<Decimal>,
}

impl MeetupEvent {
    pub fn require<'a>(field: &'a Option<String>, name: &str, kind: EventType) -> Result<&'a str> {
        field.as_deref().filter(|v| !v.is_empty()).ok_or_else(|| {
            DepositError::ValidationError(format!("{:?} event requires `{}`", kind, name))
        })
    }
}

/// Reads meetup events from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths
/// so trailing empty columns may be omitted.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes events.
    pub fn events(self) -> impl Iterator<Item = Result<MeetupEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(DepositError::from))
    }
}
