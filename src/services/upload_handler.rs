use crate::api::error::AppError;
use crate::models::{FilePart, UploadSession};
use crate::services::notifier::NotificationChannel;
use crate::services::progress::{ProgressMeter, ProgressTransform};
use crate::services::storage::PersistenceSink;
use crate::services::throttle::Clock;
use crate::utils::validation::sanitize_filename;
use axum::extract::{FromRequest, Multipart, Request};
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub field_name: String,
    pub file_name: String,
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct UploadSummary {
    pub files: Vec<StoredFile>,
}

impl UploadSummary {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

/// Turns a multipart request body into files on disk, reporting progress per file.
///
/// One instance is built per request and owns that request's [`UploadSession`].
pub struct UploadHandler {
    session: UploadSession,
    channel: Arc<dyn NotificationChannel>,
    sink: Arc<dyn PersistenceSink>,
    clock: Arc<dyn Clock>,
}

impl UploadHandler {
    pub fn new(
        session: UploadSession,
        channel: Arc<dyn NotificationChannel>,
        sink: Arc<dyn PersistenceSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session,
            channel,
            sink,
            clock,
        }
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    /// Binds a multipart parser to the request headers and body.
    ///
    /// Fails when the content type is not multipart or carries no boundary.
    pub async fn register_parsing(&self, request: Request) -> Result<Multipart, AppError> {
        Multipart::from_request(request, &())
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
    }

    /// Drives every part of the body to completion. Resolves only once the body is consumed
    /// and each file part has been persisted, or with the first failure.
    pub async fn process(&self, mut multipart: Multipart) -> Result<UploadSummary, AppError> {
        let mut summary = UploadSummary::default();

        let result: Result<(), AppError> = async {
            while let Some(mut field) = multipart.next_field().await? {
                let field_name = field.name().unwrap_or_default().to_string();
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    // plain form value, not a file; discard it chunk by chunk
                    while field.chunk().await?.is_some() {}
                    continue;
                };

                let stored = self
                    .on_file_part(FilePart {
                        field_name,
                        file_name,
                        byte_stream: field,
                    })
                    .await?;
                summary.files.push(stored);
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            // Consume what is left so the client sees the error instead of a connection reset
            tracing::warn!("Upload failed: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            return Err(e);
        }

        Ok(summary)
    }

    /// Streams one file through `ProgressTransform` into the persistence sink.
    ///
    /// Each call gets its own meter and throttle window, so files never affect each other.
    pub async fn on_file_part<S, E>(&self, part: FilePart<S>) -> Result<StoredFile, AppError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Into<AppError> + Send,
    {
        let file_name =
            sanitize_filename(&part.file_name).map_err(|e| AppError::BadRequest(e.to_string()))?;
        tracing::info!(
            "Uploading field '{}' as {} into {}",
            part.field_name,
            file_name,
            self.session.destination_folder.display()
        );

        let meter = ProgressMeter::new(
            file_name.clone(),
            self.channel.clone(),
            self.session.session_id.clone(),
            self.session.progress_interval,
            self.clock.clone(),
        );
        let mut target = self
            .sink
            .open(&self.session.destination_folder, &file_name)
            .await?;
        let mut source = ProgressTransform::new(Box::pin(part.byte_stream), meter);

        let copied: Result<(), AppError> = async {
            // write_all completes before the next chunk is pulled
            while let Some(chunk) = source.try_next().await.map_err(Into::<AppError>::into)? {
                target.write_all(&chunk).await?;
            }
            target.shutdown().await?;
            Ok(())
        }
        .await;

        let meter = source.meter();
        let bytes = meter.processed();
        if let Err(e) = copied {
            tracing::warn!(
                "Transfer of {} aborted after {} bytes, partial file left in place: {}",
                meter.file_name(),
                bytes,
                e
            );
            return Err(e);
        }

        tracing::info!("File {} stored ({} bytes)", meter.file_name(), bytes);
        Ok(StoredFile {
            field_name: part.field_name,
            file_name,
            bytes,
        })
    }
}
