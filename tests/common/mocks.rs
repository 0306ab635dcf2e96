//! Mock version of the record writers.
use mockall::mock;

use bulk_loader::{BatchError, core::item::ItemWriter, item::record::Record};

mock! {
    pub Writer {}
    impl ItemWriter<Record> for Writer {
        fn write(&self, items: &[Record]) -> Result<(), BatchError>;
        fn flush(&self) -> Result<(), BatchError>;
        fn open(&self) -> Result<(), BatchError>;
        fn close(&self) -> Result<(), BatchError>;
    }
}
