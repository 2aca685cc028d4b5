use crate::url::UrlService;
use agora_error::{bail, Error, ErrorType, Result, ResultExt};
use agora_storage::{fs::Storage, validate_name, BoxError, StorageBackend};
use bytes::Bytes;
use futures_util::{
    stream::{self, BoxStream},
    StreamExt, TryStreamExt,
};
use image::{ImageFormat, ImageReader};
use img_parts::{DynImage, ImageEXIF};
use serde::{Deserialize, Serialize};
use std::{io::Cursor, sync::Arc};
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// 2 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 2 * 1024 * 1024;

const CHUNK_SIZE: usize = 64 * 1024;

/// Receives the upload progress in percent
pub type Progress = Arc<dyn Fn(f64) + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    Gif,
    Jpeg,
    Png,
}

impl Kind {
    fn from_content_type(content_type: &str) -> Option<Self> {
        let mime: mime::Mime = content_type.parse().ok()?;
        if mime.type_() != mime::IMAGE {
            return None;
        }

        match mime.subtype().as_str() {
            "gif" => Some(Self::Gif),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            Self::Gif => ImageFormat::Gif,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "gif" => Some(Self::Gif),
            "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    fn mime(self) -> mime::Mime {
        match self {
            Self::Gif => mime::IMAGE_GIF,
            Self::Jpeg => mime::IMAGE_JPEG,
            Self::Png => mime::IMAGE_PNG,
        }
    }

    fn supports_exif(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

/// Media type of a stored file, derived from its extension
#[must_use]
pub fn media_type(file: &str) -> Option<mime::Mime> {
    let (_, extension) = file.rsplit_once('.')?;
    Kind::from_extension(extension).map(Kind::mime)
}

#[allow(clippy::cast_precision_loss)]
fn percentage(written: usize, total: usize) -> f64 {
    written as f64 / total as f64 * 100.0
}

fn malformed<E>(err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::new(ErrorType::BadRequest(Some("malformed image".into())), err)
}

/// Remove the EXIF metadata of the image, if the format carries any
fn strip_exif(kind: Kind, data: Bytes) -> Result<Bytes> {
    if !kind.supports_exif() {
        return Ok(data);
    }

    let Some(mut image) = DynImage::from_bytes(data).map_err(malformed)? else {
        bail!(type = ErrorType::BadRequest(Some("malformed image".into())), "unrecognised image container");
    };
    image.set_exif(None);

    Ok(image.encoder().bytes())
}

#[derive(TypedBuilder)]
pub struct Upload {
    #[builder(setter(into))]
    content_type: String,
    data: Bytes,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, TypedBuilder)]
pub struct UploadService {
    #[builder(default = DEFAULT_MAX_UPLOAD_SIZE)]
    max_upload_size: usize,
    storage_backend: Storage,
    url_service: UrlService,
}

impl UploadService {
    /// Store an image and return its public URL and dimensions
    ///
    /// The progress callback is invoked after every chunk written to the storage and receives 100 once the upload is complete
    #[instrument(skip_all, fields(content_type = %upload.content_type, size = upload.data.len()))]
    pub async fn upload(&self, upload: Upload, progress: Option<Progress>) -> Result<UploadedImage> {
        let Some(kind) = Kind::from_content_type(&upload.content_type) else {
            bail!(
                type = ErrorType::UnsupportedMediaType,
                format!("unsupported content type: {}", upload.content_type)
            );
        };

        if upload.data.is_empty() {
            bail!(type = ErrorType::BadRequest(Some("empty upload".into())), "empty upload");
        }
        if upload.data.len() > self.max_upload_size {
            let message = format!(
                "file exceeds the maximum upload size of {} bytes",
                self.max_upload_size
            );
            bail!(type = ErrorType::BadRequest(Some(message)), message.clone());
        }

        let guessed = image::guess_format(&upload.data).ok();
        if guessed != Some(kind.format()) {
            bail!(
                type = ErrorType::BadRequest(Some("content doesn't match the declared type".into())),
                "content doesn't match the declared type"
            );
        }

        let (width, height) = ImageReader::with_format(Cursor::new(&upload.data[..]), kind.format())
            .into_dimensions()
            .map_err(malformed)?;

        let data = strip_exif(kind, upload.data)?;
        let file = format!("{}.{}", Uuid::now_v7(), kind.extension());
        self.write_chunked(&file, data, progress.clone()).await?;

        if let Some(progress) = progress {
            progress(100.0);
        }
        debug!(%file, width, height, "stored upload");

        Ok(UploadedImage {
            url: self.url_service.media_url(&file),
            width,
            height,
        })
    }

    async fn write_chunked(&self, file: &str, data: Bytes, progress: Option<Progress>) -> Result<()> {
        let total = data.len();
        let chunks: Vec<Bytes> = (0..total)
            .step_by(CHUNK_SIZE)
            .map(|start| data.slice(start..total.min(start + CHUNK_SIZE)))
            .collect();

        // Storage pulls the next chunk once the previous one is written
        let mut written = 0;
        let chunk_stream = stream::iter(chunks).map(move |chunk| {
            if written > 0 {
                if let Some(ref progress) = progress {
                    progress(percentage(written, total));
                }
            }
            written += chunk.len();

            Ok::<_, BoxError>(chunk)
        });

        self.storage_backend
            .put(file, chunk_stream)
            .await
            .map_err(Error::msg)
    }

    /// Stream a stored file
    pub async fn stream(&self, file: &str) -> Result<BoxStream<'static, Result<Bytes>>> {
        if validate_name(file).is_err() || media_type(file).is_none() {
            bail!(type = ErrorType::NotFound, "media not found");
        }

        let stream = self
            .storage_backend
            .get(file)
            .await
            .map_err(Error::msg)
            .with_error_type(ErrorType::NotFound)?;

        Ok(stream.map_err(Error::msg).boxed())
    }
}
