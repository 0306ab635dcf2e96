use std::fmt::Debug;

use log::{debug, info};

use crate::{BatchError, core::item::ItemWriter};

/// Writer that logs items instead of storing them. Backs `--dry-run`.
#[derive(Default)]
pub struct LoggerWriter;

impl<T> ItemWriter<T> for LoggerWriter
where
    T: Debug,
{
    fn write(&self, items: &[T]) -> Result<(), BatchError> {
        info!("Dry run: {} records not sent", items.len());
        items.iter().for_each(|item| debug!("Record:{:?}", item));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::item::ItemWriter;

    use super::LoggerWriter;

    #[test]
    fn write_should_always_succeed() {
        let writer = LoggerWriter;
        assert!(writer.write(&["a", "b"]).is_ok());
        assert!(ItemWriter::<u8>::write(&writer, &[]).is_ok());
    }
}
