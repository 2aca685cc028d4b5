//!
//! File system backed implementation of the [`StorageBackend`] trait
//!

use crate::{validate_name, Result, StorageBackend};
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use std::path::PathBuf;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;

#[derive(Clone, Debug)]
/// File system storage
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    /// Create a new file system storage rooted at the directory
    #[must_use]
    pub fn new(storage_dir: PathBuf) -> Self {
        Self { storage_dir }
    }

    /// Create the storage directory if it doesn't exist yet
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.storage_dir).await?;
        Ok(())
    }

    fn object_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.storage_dir.join(name))
    }
}

impl StorageBackend for Storage {
    async fn delete(&self, name: &str) -> Result<()> {
        fs::remove_file(self.object_path(name)?).await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<impl Stream<Item = Result<Bytes>> + Send + 'static> {
        let file = File::open(self.object_path(name)?).await?;
        Ok(ReaderStream::new(file).map_err(Into::into))
    }

    async fn put<T>(&self, name: &str, input_stream: T) -> Result<()>
    where
        T: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        let path = self.object_path(name)?;
        let mut file = File::create(&path).await?;
        let mut input_stream = std::pin::pin!(input_stream);

        let written = async {
            while let Some(chunk) = input_stream.next().await.transpose()? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;

            Ok::<_, crate::BoxError>(())
        }
        .await;

        // Don't leave partial objects behind
        if written.is_err() {
            let _ = fs::remove_file(&path).await;
        }

        written
    }
}

#[cfg(test)]
mod test {
    use crate::{fs::Storage, BoxError, StorageBackend};
    use bytes::{BufMut, Bytes, BytesMut};
    use futures_util::{future, stream, TryStreamExt};
    use tempfile::TempDir;

    const PIXELS: &[u8] = b"\x89PNG\r\n\x1a\n not really an image, but close enough";

    #[tokio::test]
    async fn put_get_delete() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().join("media"));
        storage.ensure_dir().await.unwrap();

        let chunks = PIXELS
            .chunks(7)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect::<Vec<Result<_, BoxError>>>();
        storage.put("avatar.png", stream::iter(chunks)).await.unwrap();

        let data = storage
            .get("avatar.png")
            .await
            .unwrap()
            .try_fold(BytesMut::new(), |mut acc, chunk| {
                acc.put(chunk);
                future::ok(acc)
            })
            .await
            .unwrap();
        assert_eq!(&data[..], PIXELS);

        storage.delete("avatar.png").await.unwrap();
        assert!(storage.get("avatar.png").await.is_err());
    }

    #[tokio::test]
    async fn failed_upload_leaves_nothing_behind() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().to_owned());

        let chunks: Vec<Result<Bytes, BoxError>> =
            vec![Ok(Bytes::from_static(b"half")), Err("connection reset".into())];
        assert!(storage.put("broken.png", stream::iter(chunks)).await.is_err());
        assert!(!temp_dir.path().join("broken.png").exists());
    }

    #[tokio::test]
    async fn rejects_escaping_names() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().to_owned());

        assert!(storage.get("../secret").await.is_err());
        assert!(storage
            .put("../secret", stream::empty::<Result<Bytes, BoxError>>())
            .await
            .is_err());
    }
}
