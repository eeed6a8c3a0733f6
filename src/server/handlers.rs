use crate::core::mime::{detect_mime, is_image_mime};
use crate::core::recompress::recompress;
use crate::core::sanitize::{sanitize_filename, split_filename};
use crate::core::storage::{delete_file, write_file};
use crate::server::error::ApiError;
use crate::server::types::{
    AppState, DeleteRequest, DeleteResponse, FileMetadata, UploadQuery, UploadResponse,
};
use crate::utils::auth::is_access_key_valid;
use crate::utils::constants::UPLOAD_FIELD_NAME;
use crate::utils::hash::filename_md5_hex;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::{Json, http::StatusCode};
use bytes::Bytes;
use serde_json::{Value, json};
use std::sync::Arc;

const UPLOAD_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

// server status handler
pub async fn server_status_handler() -> Json<Value> {
    Json(json!({"status": "running"}))
}

// a part without a filename is a plain form field
fn selected_file_name(file_name: Option<&str>) -> Result<String, ApiError> {
    match file_name {
        None => Err(ApiError::BadRequest("No file part".to_string())),
        Some("") => Err(ApiError::BadRequest("No selected file".to_string())),
        Some(name) => Ok(name.to_string()),
    }
}

async fn read_file_part(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            continue;
        }

        let file_name = selected_file_name(field.file_name())?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Error reading file: {}", e)))?;
        return Ok((file_name, bytes));
    }

    Err(ApiError::BadRequest("No file part".to_string()))
}

fn with_jpg_extension(file_name: &str) -> String {
    let (stem, _) = split_filename(file_name);
    format!("{}.jpg", stem)
}

pub async fn upload_file_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    // an unparseable query (e.g. a repeated key) counts as no key
    let key = query.ok().and_then(|Query(params)| params.key);
    if !is_access_key_valid(key.as_deref(), &state.hard_key) {
        tracing::warn!("Upload rejected: invalid access key");
        return Err(ApiError::AccessDenied);
    }

    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("Upload rejected: {}", e);
        ApiError::BadRequest("No file part".to_string())
    })?;
    let (original_name, bytes) = read_file_part(&mut multipart).await?;

    let mime_type = detect_mime(&bytes);
    let mut file_name = sanitize_filename(&original_name);
    tracing::info!(
        "Received {} ({} bytes, {}) as {}",
        original_name,
        bytes.len(),
        mime_type,
        file_name
    );

    let options = state.recompress;
    let stored = if bytes.len() > options.max_bytes && is_image_mime(&mime_type) {
        let original_len = bytes.len();
        let recompressed =
            tokio::task::spawn_blocking(move || recompress(&bytes, &options)).await??;

        tracing::info!(
            "Recompressed {} from {} to {} bytes at {}x{} (quality {}, {} passes)",
            file_name,
            original_len,
            recompressed.bytes.len(),
            recompressed.width,
            recompressed.height,
            recompressed.quality,
            recompressed.attempts
        );
        file_name = with_jpg_extension(&file_name);
        Bytes::from(recompressed.bytes)
    } else {
        bytes
    };

    let (path, size) = write_file(&state.upload_folder, &file_name, &stored).await?;
    tracing::info!("Stored {} ({} bytes)", path.display(), size);

    let data = FileMetadata {
        id: filename_md5_hex(&file_name),
        size,
        title: split_filename(&file_name).0.to_string(),
        mime_type: detect_mime(&stored),
        timestamp: chrono::Local::now()
            .format(UPLOAD_TIMESTAMP_FORMAT)
            .to_string(),
        file_name,
    };

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            message: "File uploaded successfully.".to_string(),
            data,
        }),
    ))
}

pub async fn delete_file_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DeleteResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!("Delete rejected: {}", e.body_text());
        ApiError::BadRequest(e.body_text())
    })?;

    if delete_file(&state.upload_folder, &request.file_name).await? {
        tracing::info!("Deleted {}", request.file_name);
        Ok((
            StatusCode::OK,
            Json(DeleteResponse {
                message: "File deleted successfully.".to_string(),
                file_name: request.file_name,
            }),
        ))
    } else {
        tracing::warn!("Delete requested for missing file {}", request.file_name);
        Ok((
            StatusCode::NOT_FOUND,
            Json(DeleteResponse {
                message: "File does not exist.".to_string(),
                file_name: request.file_name,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recompress::RecompressOptions;
    use crate::server::router::build_router;
    use crate::utils::constants::MAX_FILE_SIZE;
    use axum_test::TestServer;
    use axum_test::multipart::{MultipartForm, Part};
    use image::codecs::jpeg::JpegEncoder;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::path::Path;

    const TEST_KEY: &str = "test-hard-key";

    fn test_server(upload_folder: &Path) -> TestServer {
        let state = AppState {
            upload_folder: upload_folder.to_path_buf(),
            hard_key: TEST_KEY.to_string(),
            recompress: RecompressOptions::default(),
        };
        TestServer::new(build_router(state)).unwrap()
    }

    fn noise_image(width: u32, height: u32) -> RgbImage {
        let mut state: u32 = 0x9e37_79b9;
        RgbImage::from_fn(width, height, |_, _| {
            let mut next = || {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            };
            Rgb([next(), next(), next()])
        })
    }

    fn file_form(file_name: &str, bytes: Vec<u8>) -> MultipartForm {
        MultipartForm::new().add_part("file", Part::bytes(bytes).file_name(file_name))
    }

    fn stored_files(folder: &Path) -> Vec<String> {
        match std::fs::read_dir(folder) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn upload(server: &TestServer, file_name: &str, bytes: Vec<u8>) -> FileMetadata {
        let response = server
            .post("/upload")
            .add_query_param("key", TEST_KEY)
            .multipart(file_form(file_name, bytes))
            .await;
        response.assert_status_ok();
        response.json::<UploadResponse>().data
    }

    #[test]
    fn test_selected_file_name() {
        assert!(matches!(
            selected_file_name(None),
            Err(ApiError::BadRequest(msg)) if msg == "No file part"
        ));
        assert!(matches!(
            selected_file_name(Some("")),
            Err(ApiError::BadRequest(msg)) if msg == "No selected file"
        ));
        assert_eq!(selected_file_name(Some("a.txt")).unwrap(), "a.txt");
    }

    #[test]
    fn test_with_jpg_extension() {
        assert_eq!(with_jpg_extension("scan_0a1b2c3d.png"), "scan_0a1b2c3d.jpg");
        assert_eq!(with_jpg_extension("raw_0a1b2c3d"), "raw_0a1b2c3d.jpg");
    }

    #[tokio::test]
    async fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let response = server.get("/").await;

        response.assert_status_ok();
        response.assert_json(&json!({"status": "running"}));
    }

    #[tokio::test]
    async fn test_upload_wrong_key_forbidden_and_nothing_written() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("uploads");
        let server = test_server(&folder);

        let response = server
            .post("/upload")
            .add_query_param("key", "not-the-key")
            .multipart(file_form("notes.txt", b"hello".to_vec()))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        response.assert_json(&json!({"error": "Access forbidden!"}));

        let response = server
            .post("/upload")
            .multipart(file_form("notes.txt", b"hello".to_vec()))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        assert!(!folder.exists());
    }

    #[tokio::test]
    async fn test_upload_repeated_key_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("uploads");
        let server = test_server(&folder);

        let response = server
            .post("/upload")
            .add_query_param("key", "wrong")
            .add_query_param("key", "wrong2")
            .multipart(file_form("notes.txt", b"hello".to_vec()))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        response.assert_json(&json!({"error": "Access forbidden!"}));
        assert!(!folder.exists());
    }

    #[tokio::test]
    async fn test_upload_empty_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let response = server
            .post("/upload")
            .add_query_param("key", TEST_KEY)
            .multipart(file_form("", b"abc".to_vec()))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"error": "No selected file"}));
        assert!(stored_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_file_part() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let response = server
            .post("/upload")
            .add_query_param("key", TEST_KEY)
            .multipart(MultipartForm::new().add_text("comment", "no file here"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({"error": "No file part"}));

        let response = server
            .post("/upload")
            .add_query_param("key", TEST_KEY)
            .multipart(MultipartForm::new().add_part("file", Part::bytes(b"abc".to_vec())))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        assert!(stored_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_small_file_stored_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let content = b"quarterly numbers\n".to_vec();

        let data = upload(&server, "notes.txt", content.clone()).await;

        assert!(data.file_name.starts_with("notes_"));
        assert!(data.file_name.ends_with(".txt"));
        assert_eq!(data.file_name.len(), "notes_".len() + 8 + ".txt".len());
        assert_eq!(data.id, filename_md5_hex(&data.file_name));
        assert_eq!(data.size, content.len() as u64);
        assert_eq!(data.title, data.file_name.trim_end_matches(".txt"));
        assert_eq!(data.mime_type, "text/plain");
        assert!(
            chrono::NaiveDateTime::parse_from_str(&data.timestamp, UPLOAD_TIMESTAMP_FORMAT).is_ok()
        );
        assert_eq!(std::fs::read(dir.path().join(&data.file_name)).unwrap(), content);
    }

    #[tokio::test]
    async fn test_upload_response_shape() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let response = server
            .post("/upload")
            .add_query_param("key", TEST_KEY)
            .multipart(file_form("Quarterly report (final).pdf", b"%PDF-1.4\n".to_vec()))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["message"], "File uploaded successfully.");
        let file_name = body["data"]["fileName"].as_str().unwrap();
        assert!(file_name.starts_with("Quarterly_report_final_"));
        assert!(file_name.ends_with(".pdf"));
        assert_eq!(body["data"]["type"], "application/pdf");
        for field in ["id", "size", "title", "timestamp"] {
            assert!(body["data"].get(field).is_some(), "missing {field}");
        }
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let first = upload(&server, "photo.txt", b"first".to_vec()).await;
        let second = upload(&server, "photo.txt", b"second".to_vec()).await;

        assert_ne!(first.file_name, second.file_name);
        assert_eq!(stored_files(dir.path()).len(), 2);
    }

    #[tokio::test]
    async fn test_upload_large_jpeg_recompressed() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(noise_image(1100, 1100))
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, 100))
            .unwrap();
        assert!(jpeg.len() > MAX_FILE_SIZE);

        let data = upload(&server, "holiday.JPEG", jpeg).await;

        assert!(data.file_name.starts_with("holiday_"));
        assert!(data.file_name.ends_with(".jpg"));
        assert_eq!(data.mime_type, "image/jpeg");
        assert!(data.size <= MAX_FILE_SIZE as u64);
        let on_disk = std::fs::metadata(dir.path().join(&data.file_name)).unwrap();
        assert_eq!(on_disk.len(), data.size);
    }

    #[tokio::test]
    async fn test_upload_large_png_becomes_jpg() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(noise_image(700, 700))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        let png = png.into_inner();
        assert!(png.len() > MAX_FILE_SIZE);

        let data = upload(&server, "scan.png", png).await;

        assert!(data.file_name.ends_with(".jpg"));
        assert_eq!(data.mime_type, "image/jpeg");
        let stored = std::fs::read(dir.path().join(&data.file_name)).unwrap();
        assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Jpeg);
        assert_eq!(stored_files(dir.path()), vec![data.file_name]);
    }

    #[tokio::test]
    async fn test_upload_large_non_image_stored_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let content: Vec<u8> = (0..MAX_FILE_SIZE + 4096).map(|i| [0xFF, 0x00][i % 2]).collect();

        let data = upload(&server, "dump.bin", content.clone()).await;

        assert!(data.file_name.ends_with(".bin"));
        assert_eq!(data.size, content.len() as u64);
        assert_eq!(data.mime_type, "application/octet-stream");
        assert_eq!(std::fs::read(dir.path().join(&data.file_name)).unwrap(), content);
    }

    #[tokio::test]
    async fn test_upload_corrupt_large_image_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let mut content = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        content.resize(MAX_FILE_SIZE + 1, 0xAB);

        let response = server
            .post("/upload")
            .add_query_param("key", TEST_KEY)
            .multipart(file_form("broken.png", content))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("Error opening image"));
        assert!(stored_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_delete_never_uploaded_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let response = server
            .post("/delete")
            .json(&json!({"fileName": "ghost_00000000.txt"}))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({
            "message": "File does not exist.",
            "fileName": "ghost_00000000.txt"
        }));
    }

    #[tokio::test]
    async fn test_upload_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let data = upload(&server, "report.csv", b"a,b\n1,2\n".to_vec()).await;
        assert!(dir.path().join(&data.file_name).is_file());

        let response = server
            .post("/delete")
            .json(&json!({"fileName": data.file_name}))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "message": "File deleted successfully.",
            "fileName": data.file_name
        }));
        assert!(!dir.path().join(&data.file_name).exists());

        let response = server
            .post("/delete")
            .json(&json!({"fileName": data.file_name}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_malformed_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let response = server.post("/delete").json(&json!({"name": "x.txt"})).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server.post("/delete").text("fileName=x.txt").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    // Known gap: delete resolves names without confining them to the upload folder.
    #[tokio::test]
    async fn test_delete_follows_parent_segments_outside_folder() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("uploads");
        std::fs::create_dir(&folder).unwrap();
        let outside = root.path().join("outside.txt");
        std::fs::write(&outside, b"not an upload").unwrap();
        let server = test_server(&folder);

        let response = server
            .post("/delete")
            .json(&json!({"fileName": "../outside.txt"}))
            .await;

        response.assert_status_ok();
        assert!(!outside.exists());
    }
}
