use crate::journal::LedgerEvent;
use crate::models::AccountOutput;
use csv_async::{AsyncReaderBuilder, AsyncWriterBuilder};
use futures::stream::Stream;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};

const ACCOUNT_HEADER: [&str; 4] = ["account_number", "holder_name", "account_type", "balance"];

/// Stream journal events from async reader
pub fn stream_events<R: AsyncRead + Unpin + Send + 'static>(
    reader: R,
) -> impl Stream<Item = Result<LedgerEvent, csv_async::Error>> {
    let compat_reader = reader.compat();
    let csv_reader = AsyncReaderBuilder::new()
        .has_headers(false)
        .trim(csv_async::Trim::All)
        .flexible(true)
        .create_deserializer(compat_reader);

    csv_reader.into_deserialize::<LedgerEvent>()
}

pub async fn write_accounts<W: AsyncWrite + Unpin>(
    writer: W,
    accounts: Vec<AccountOutput>,
) -> Result<(), anyhow::Error> {
    let mut serializer = AsyncWriterBuilder::new()
        .has_headers(false)
        .create_serializer(writer.compat_write());

    // Header is written explicitly so an empty ledger still gets one
    serializer.serialize(ACCOUNT_HEADER).await?;

    for account in accounts {
        serializer.serialize(&account).await?;
    }

    serializer.flush().await?;
    Ok(())
}
