use crate::domain::deposit::UserDeposit;
use crate::domain::money::Amount;
use crate::domain::points::{PointTransaction, PointTransactionKind, UserPoints};
use crate::domain::ports::{DepositStore, PointsLedger};
use crate::error::{DepositError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for deposit records, keyed by deposit id.
pub const CF_DEPOSITS: &str = "deposits";
/// Column Family for point balances, keyed by user id.
pub const CF_POINTS: &str = "points";
/// Column Family for the point ledger, keyed by `user/created_at/id`.
pub const CF_POINT_TRANSACTIONS: &str = "point_transactions";

/// A persistent store implementation using RocksDB.
///
/// Implements both `DepositStore` and `PointsLedger`, each entity in its
/// own Column Family with JSON values. Ledger mutations are serialized
/// through a mutex and written as one batch so a balance never diverges
/// from its transaction log.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    ledger_lock: Arc<Mutex<()>>,
}

fn missing_cf(name: &str) -> DepositError {
    DepositError::InternalError(Box::new(std::io::Error::other(format!(
        "{} column family not found",
        name
    ))))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn transaction_key(tx: &PointTransaction) -> String {
    format!(
        "{}/{:020}/{}",
        tx.user_id,
        tx.created_at.timestamp_nanos_opt().unwrap_or_default(),
        tx.id
    )
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// the deposit and points column families when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_DEPOSITS, CF_POINTS, CF_POINT_TRANSACTIONS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            ledger_lock: Arc::new(Mutex::new(())),
        })
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.db.cf_handle(cf_name).ok_or_else(|| missing_cf(cf_name))?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_key, value) = item?;
            items.push(decode(&value)?);
        }
        Ok(items)
    }

    fn read_points(&self, user_id: &str) -> Result<UserPoints> {
        let cf = self.db.cf_handle(CF_POINTS).ok_or_else(|| missing_cf(CF_POINTS))?;
        match self.db.get_cf(&cf, user_id.as_bytes())? {
            Some(bytes) => decode(&bytes),
            None => Ok(UserPoints::new(user_id)),
        }
    }

    fn write_ledger(&self, points: &UserPoints, tx: &PointTransaction) -> Result<()> {
        let cf_points = self.db.cf_handle(CF_POINTS).ok_or_else(|| missing_cf(CF_POINTS))?;
        let cf_txs = self
            .db
            .cf_handle(CF_POINT_TRANSACTIONS)
            .ok_or_else(|| missing_cf(CF_POINT_TRANSACTIONS))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_points, points.user_id.as_bytes(), encode(points)?);
        batch.put_cf(&cf_txs, transaction_key(tx).as_bytes(), encode(tx)?);
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl DepositStore for RocksDBStore {
    async fn store(&self, deposit: UserDeposit) -> Result<()> {
        let cf = self.db.cf_handle(CF_DEPOSITS).ok_or_else(|| missing_cf(CF_DEPOSITS))?;
        self.db.put_cf(&cf, deposit.id.as_bytes(), encode(&deposit)?)?;
        Ok(())
    }

    async fn get(&self, deposit_id: &str) -> Result<Option<UserDeposit>> {
        let cf = self.db.cf_handle(CF_DEPOSITS).ok_or_else(|| missing_cf(CF_DEPOSITS))?;
        match self.db.get_cf(&cf, deposit_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_by_user_and_meetup(
        &self,
        user_id: &str,
        meetup_id: &str,
    ) -> Result<Option<UserDeposit>> {
        let deposits: Vec<UserDeposit> = self.scan(CF_DEPOSITS)?;
        Ok(deposits
            .into_iter()
            .filter(|d| d.user_id == user_id && d.meetup_id == meetup_id)
            .max_by_key(|d| d.precedence()))
    }

    async fn list_by_meetup(&self, meetup_id: &str) -> Result<Vec<UserDeposit>> {
        let deposits: Vec<UserDeposit> = self.scan(CF_DEPOSITS)?;
        Ok(deposits
            .into_iter()
            .filter(|d| d.meetup_id == meetup_id)
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<UserDeposit>> {
        self.scan(CF_DEPOSITS)
    }
}

#[async_trait]
impl PointsLedger for RocksDBStore {
    async fn get_user_points(&self, user_id: &str) -> Result<UserPoints> {
        self.read_points(user_id)
    }

    async fn add_points(
        &self,
        user_id: &str,
        amount: Amount,
        description: &str,
        related_deposit_id: Option<&str>,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.ledger_lock.lock().await;
        let mut points = self.read_points(user_id)?;
        points.add(amount)?;

        let mut tx = PointTransaction::new(user_id, PointTransactionKind::Earn, amount, description);
        tx.related_deposit_id = related_deposit_id.map(str::to_string);
        tx.expiry_date = expiry_date;
        self.write_ledger(&points, &tx)
    }

    async fn deduct_points(&self, user_id: &str, amount: Amount, description: &str) -> Result<()> {
        let _guard = self.ledger_lock.lock().await;
        let mut points = self.read_points(user_id)?;
        points.deduct(amount)?;

        let tx = PointTransaction::new(user_id, PointTransactionKind::Use, amount, description);
        self.write_ledger(&points, &tx)
    }

    async fn transactions(&self, user_id: &str) -> Result<Vec<PointTransaction>> {
        let cf = self
            .db
            .cf_handle(CF_POINT_TRANSACTIONS)
            .ok_or_else(|| missing_cf(CF_POINT_TRANSACTIONS))?;
        let prefix = format!("{}/", user_id);

        let mut txs = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            txs.push(decode(&value)?);
        }
        Ok(txs)
    }

    async fn all_balances(&self) -> Result<Vec<UserPoints>> {
        self.scan(CF_POINTS)
    }
}
