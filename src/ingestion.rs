use crate::error::{PipelineError, Result};
use crate::schema::Transaction;
use crate::utils::{format_timestamp, parse_timestamp};
use csv::StringRecord;
use log::{debug, info};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const ARTIFACT_HEADER: [&str; 8] = [
    "Invoice",
    "StockCode",
    "Description",
    "Quantity",
    "InvoiceDate",
    "Price",
    "Customer ID",
    "Country",
];

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub transactions: Vec<Transaction>,
    /// Rows dropped because quantity, price or timestamp was missing or unreadable.
    pub skipped: usize,
}

struct ColumnMap {
    invoice: usize,
    stock_code: usize,
    description: Option<usize>,
    quantity: usize,
    invoice_date: usize,
    price: usize,
    customer_id: Option<usize>,
    country: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
        };
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| PipelineError::MissingColumn(aliases[0].to_string()))
        };

        Ok(Self {
            invoice: require(&["Invoice", "InvoiceNo"])?,
            stock_code: require(&["StockCode"])?,
            description: find(&["Description"]),
            quantity: require(&["Quantity"])?,
            invoice_date: require(&["InvoiceDate"])?,
            price: require(&["Price", "UnitPrice"])?,
            customer_id: find(&["Customer ID", "CustomerID"]),
            country: require(&["Country"])?,
        })
    }

    fn parse(&self, record: &StringRecord) -> Option<Transaction> {
        let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

        let quantity = field(self.quantity).parse::<i64>().ok()?;
        let price = field(self.price).parse::<f64>().ok().filter(|p| p.is_finite())?;
        let invoice_date = parse_timestamp(field(self.invoice_date)).ok()?;

        Some(Transaction {
            invoice: field(self.invoice).to_string(),
            stock_code: field(self.stock_code).to_string(),
            description: self.description.map(field).unwrap_or("").to_string(),
            quantity,
            invoice_date,
            price,
            customer_id: self.customer_id.and_then(|idx| parse_customer_id(field(idx))),
            country: field(self.country).to_string(),
        })
    }
}

/// Customer ids are integers but spreadsheet exports often write them as `13085.0`.
fn parse_customer_id(raw: &str) -> Option<u64> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(id) = raw.parse::<u64>() {
        return Some(id);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as u64)
}

/// Text fields that are not valid UTF-8 (Latin-1 exports) are decoded lossily
/// rather than failing the whole file.
pub fn read_transactions_from_reader<R: Read>(reader: R) -> Result<LoadedTable> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = StringRecord::from_byte_record_lossy(csv_reader.byte_headers()?.clone());
    let columns = ColumnMap::from_headers(&headers)?;

    let mut transactions = Vec::new();
    let mut skipped = 0;

    for result in csv_reader.byte_records() {
        let record = StringRecord::from_byte_record_lossy(result?);
        match columns.parse(&record) {
            Some(tx) => transactions.push(tx),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(
            "Skipped {} rows with missing quantity, price or invoice date",
            skipped
        );
    }

    Ok(LoadedTable {
        transactions,
        skipped,
    })
}

pub fn read_transactions(path: &Path) -> Result<LoadedTable> {
    let file = File::open(path)?;
    let table = read_transactions_from_reader(file)?;
    info!(
        "Loaded {} transactions from {} ({} unreadable rows dropped)",
        table.transactions.len(),
        path.display(),
        table.skipped
    );
    Ok(table)
}

pub fn write_transactions_to_writer<W: Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(ARTIFACT_HEADER)?;

    for tx in transactions {
        let quantity = tx.quantity.to_string();
        let timestamp = format_timestamp(&tx.invoice_date);
        let price = tx.price.to_string();
        let customer = tx.customer_id.map(|id| id.to_string()).unwrap_or_default();
        csv_writer.write_record([
            tx.invoice.as_str(),
            tx.stock_code.as_str(),
            tx.description.as_str(),
            quantity.as_str(),
            timestamp.as_str(),
            price.as_str(),
            customer.as_str(),
            tx.country.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_transactions(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let file = File::create(path)?;
    write_transactions_to_writer(file, transactions)?;
    info!(
        "Wrote {} cleaned transactions to {}",
        transactions.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETAIL_II: &str = "\
Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country
489434,85048,15CM CHRISTMAS GLASS BALL 20 LIGHTS,12,2009-12-01 07:45:00,6.95,13085.0,United Kingdom
489434,79323P,PINK CHERRY LIGHTS,12,2009-12-01 07:45:00,6.75,13085,United Kingdom
C489449,22087,PAPER BUNTING WHITE LACE,-12,2009-12-01 10:33:00,2.95,,Australia
489450,21523,DOORMAT FANCY FONT,,2009-12-01 10:40:00,5.95,13085,United Kingdom
489451,21524,DOORMAT SPOTTY,4,not a date,5.95,13085,United Kingdom
";

    #[test]
    fn test_reads_retail_ii_layout() {
        let table = read_transactions_from_reader(RETAIL_II.as_bytes()).unwrap();
        assert_eq!(table.transactions.len(), 3);
        assert_eq!(table.skipped, 2);

        let first = &table.transactions[0];
        assert_eq!(first.customer_id, Some(13085));
        assert_eq!(first.quantity, 12);
        assert!((first.price - 6.95).abs() < 1e-12);

        let ret = &table.transactions[2];
        assert!(ret.is_return());
        assert_eq!(ret.customer_id, None);
        assert_eq!(ret.country, "Australia");
    }

    #[test]
    fn test_reads_uci_layout() {
        let data = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,12/1/2010 8:26,2.55,17850,United Kingdom
";
        let table = read_transactions_from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.transactions.len(), 1);
        assert_eq!(table.transactions[0].invoice, "536365");
        assert_eq!(table.transactions[0].customer_id, Some(17850));
    }

    #[test]
    fn test_missing_required_column() {
        let data = "Invoice,StockCode,Quantity,InvoiceDate,Country\n";
        let err = read_transactions_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "Price"));
    }

    #[test]
    fn test_latin1_description_does_not_abort_load() {
        let mut data = b"Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country\n\
536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2010-12-01 08:26:00,2.55,17850,United Kingdom\n"
            .to_vec();
        data.extend_from_slice(b"536366,22633,CR\xC8ME JAR,6,2010-12-01 08:28:00,1.85,17850,France\n");
        data.extend_from_slice(
            b"536367,84879,ASSORTED COLOUR BIRD ORNAMENT,32,2010-12-01 08:34:00,1.69,13047,United Kingdom\n",
        );

        let table = read_transactions_from_reader(data.as_slice()).unwrap();
        assert_eq!(table.transactions.len(), 3);
        assert_eq!(table.skipped, 0);

        let cream = &table.transactions[1];
        assert_eq!(cream.description, "CR\u{FFFD}ME JAR");
        assert_eq!(cream.quantity, 6);
        assert_eq!(cream.country, "France");
    }

    #[test]
    fn test_artifact_round_trip() {
        let table = read_transactions_from_reader(RETAIL_II.as_bytes()).unwrap();

        let mut buffer = Vec::new();
        write_transactions_to_writer(&mut buffer, &table.transactions).unwrap();

        let reread = read_transactions_from_reader(buffer.as_slice()).unwrap();
        assert_eq!(reread.skipped, 0);
        assert_eq!(reread.transactions, table.transactions);
    }
}
