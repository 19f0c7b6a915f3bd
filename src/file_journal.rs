use crate::csv_io::stream_events;
use crate::journal::{Journal, LedgerEvent};
use anyhow::Result;
use async_trait::async_trait;
use csv_async::{AsyncSerializer, AsyncWriterBuilder};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::io::SeekFrom;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Append-only journal stored as headerless CSV
pub struct FileJournal {
    path: PathBuf,
    writer: Mutex<AsyncSerializer<Compat<File>>>,
}

impl FileJournal {
    pub async fn open(path: PathBuf) -> Result<Self> {
        // Create file if doesn't exist, append if exists
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        // A crash mid-append can leave a row without its newline. Terminate it
        // so the next event starts on its own line; replay skips the fragment.
        if ends_with_torn_row(&path).await? {
            tracing::warn!(
                path = %path.display(),
                "Journal ends with an incomplete row, terminating it"
            );
            file.write_all(b"\n").await?;
            file.flush().await?;
        }

        let writer = AsyncWriterBuilder::new()
            .has_headers(false)
            .create_serializer(file.compat_write());

        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Journal for FileJournal {
    async fn append(&self, event: &LedgerEvent) -> Result<()> {
        let mut writer = self.writer.lock().await;

        writer.serialize(event).await?;
        // Flushed per event so a reply is never sent for an unwritten mutation
        writer.flush().await?;

        Ok(())
    }

    async fn replay(&self) -> Result<Vec<LedgerEvent>> {
        read_events(&self.path).await
    }
}

async fn ends_with_torn_row(path: &Path) -> Result<bool> {
    let mut file = File::open(path).await?;
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }

    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;

    Ok(last[0] != b'\n')
}

/// Read every event of a journal file, skipping rows that do not parse.
pub async fn read_events(path: &Path) -> Result<Vec<LedgerEvent>> {
    let file = File::open(path).await?;
    let stream = stream_events(BufReader::new(file));
    futures::pin_mut!(stream);

    let mut events = Vec::new();

    while let Some(result) = stream.next().await {
        match result {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable journal row"
                );
            }
        }
    }

    Ok(events)
}
