//! Code bundle: zip the code root and stream it to the hosting service.
//!
//! The archive is produced on a blocking thread and handed to the upload
//! through a bounded channel, so the whole bundle is never held in memory.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use futures_util::{StreamExt, stream};
use hostsync_hosting::ArchiveStream;
use hostsync_protocol::VersionId;
use hostsync_transfer::{TransferError, TreeWalker};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::DeployError;
use crate::remote::HostingService;

/// Archive chunks buffered between the writer thread and the upload.
const CHANNEL_DEPTH: usize = 8;

/// Size of the writes pushed into the channel.
const CHUNK_SIZE: usize = 64 * 1024;

type Chunk = io::Result<Vec<u8>>;

/// Streams a zip of the code root to the code-upload endpoint.
pub struct CodeBundler {
    root: PathBuf,
}

impl CodeBundler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Starts archiving in the background.
    ///
    /// Returns the byte stream and the writer task, which resolves to the
    /// number of files archived. An archiving error is also pushed into the
    /// stream so the consumer stops.
    pub fn archive(&self) -> (ArchiveStream, JoinHandle<Result<usize, DeployError>>) {
        let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);
        let root = self.root.clone();
        let writer = tokio::task::spawn_blocking(move || write_archive(&root, tx));

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        })
        .boxed();
        (stream, writer)
    }

    /// Archives the code root and uploads it as `version`'s bundle.
    ///
    /// Returns the number of files in the bundle. When both sides fail, a
    /// local archive error is reported ahead of the upload error it caused.
    /// An upload that succeeds without consuming the whole archive is a
    /// failure.
    pub async fn upload(
        &self,
        api: &dyn HostingService,
        version: VersionId,
    ) -> Result<usize, DeployError> {
        info!(version = %version, root = %self.root.display(), "Uploading code bundle");
        let (stream, writer) = self.archive();

        let (uploaded, archived) = tokio::join!(api.upload_code(version, stream), writer);
        let archived = archived.map_err(|e| DeployError::Task(e.to_string()))?;

        match (uploaded, archived) {
            (Ok(()), Ok(files)) => {
                info!(version = %version, files, "Code bundle uploaded");
                Ok(files)
            }
            (Err(upload), Err(DeployError::Cancelled)) => Err(upload),
            (Ok(()), Err(DeployError::Cancelled)) => Err(DeployError::Io {
                path: self.root.clone(),
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "archive truncated: upload finished before the bundle was fully sent",
                ),
            }),
            (_, Err(archive)) => Err(archive),
            (Err(upload), Ok(_)) => Err(upload),
        }
    }
}

/// Pushes each write into the channel as one chunk.
struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Ok(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer went away"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn write_archive(root: &Path, tx: mpsc::Sender<Chunk>) -> Result<usize, DeployError> {
    let errors = tx.clone();
    match build_archive(root, tx) {
        Ok(files) => Ok(files),
        // The consumer stopped reading; `upload` decides what that means.
        Err(_) if errors.is_closed() => Err(DeployError::Cancelled),
        Err(e) => {
            let _ = errors.blocking_send(Err(io::Error::other(e.to_string())));
            Err(e)
        }
    }
}

fn build_archive(root: &Path, tx: mpsc::Sender<Chunk>) -> Result<usize, DeployError> {
    let metadata = std::fs::metadata(root).map_err(|e| DeployError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_dir() {
        return Err(TransferError::NotADirectory(root.to_path_buf()).into());
    }

    let sink = BufWriter::with_capacity(CHUNK_SIZE, ChannelWriter { tx });
    let mut zip = ZipWriter::new_stream(sink);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0usize;
    for entry in TreeWalker::new(root) {
        let entry = entry.map_err(|failure| DeployError::Walk(vec![failure]))?;
        let io_err = |source| DeployError::Io {
            path: entry.path.clone(),
            source,
        };
        let mut file = File::open(&entry.path).map_err(io_err)?;

        zip.start_file(entry.relative.as_str(), options)?;
        io::copy(&mut file, &mut zip).map_err(io_err)?;
        debug!(path = %entry.relative, "archived");
        files += 1;
    }

    let mut sink = zip.finish()?;
    sink.flush().map_err(|e| DeployError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;
    Ok(files)
}
