use crate::http::extractor::{AuthExtractor, Json};
use agora_error::{bail, Error, ErrorType, Result};
use agora_service::upload::{media_type, Progress, Upload, UploadService, UploadedImage};
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use http::header::CONTENT_TYPE;
use std::sync::Arc;

fn malformed_form(err: axum::extract::multipart::MultipartError) -> Error {
    Error::new(ErrorType::BadRequest(Some(err.body_text())), err)
}

pub async fn get(
    State(upload_service): State<UploadService>,
    Path(file): Path<String>,
) -> Result<Response> {
    let Some(content_type) = media_type(&file) else {
        bail!(type = ErrorType::NotFound, "media not found");
    };
    let stream = upload_service.stream(&file).await?;

    Ok((
        [(CONTENT_TYPE, content_type.to_string())],
        Body::from_stream(stream),
    )
        .into_response())
}

pub async fn post(
    State(upload_service): State<UploadService>,
    auth: AuthExtractor,
    mut multipart: Multipart,
) -> Result<Json<UploadedImage>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(malformed_form)? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(malformed_form)?;
        upload = Some(Upload::builder().content_type(content_type).data(data).build());
        break;
    }

    let Some(upload) = upload else {
        bail!(
            type = ErrorType::BadRequest(Some("missing file field".into())),
            "missing file field"
        );
    };

    let account_id = auth.0.id;
    let progress: Progress = Arc::new(move |percent| {
        trace!(%account_id, percent, "upload progress");
    });

    Ok(Json(upload_service.upload(upload, Some(progress)).await?))
}
