use std::io::Write;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    account::AccountNo,
    ledger::{TransactionId, TransactionKind, TransactionRecord, txn_date_format},
};

#[derive(Debug, Serialize)]
struct StatementRow {
    txn_id: TransactionId,
    account_no: AccountNo,
    txn_type: TransactionKind,
    amount: Decimal,
    txn_date: String,
}

impl From<TransactionRecord> for StatementRow {
    fn from(record: TransactionRecord) -> Self {
        Self {
            txn_id: record.txn_id,
            account_no: record.account_no,
            txn_type: record.txn_type,
            amount: record.amount,
            txn_date: record.txn_date.format(txn_date_format::FORMAT).to_string(),
        }
    }
}

/// Writes a statement as CSV, one ledger record per line, with a header row.
pub fn write_statement<W>(
    output: &mut W,
    records: impl IntoIterator<Item = TransactionRecord>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    let mut empty = true;
    for record in records {
        empty = false;
        if let Err(err) = writer.serialize(StatementRow::from(record)) {
            anyhow::bail!("Failed to write statement row: {err}")
        }
    }
    if empty {
        // serialize() only emits headers together with the first row
        writer.write_record(["txn_id", "account_no", "txn_type", "amount", "txn_date"])?;
    }
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush statement: {err}")
    }
    Ok(())
}
