//! pdfium access: page text extraction and single-page rasterisation.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Both entry points here move the work onto tokio's blocking pool so the
//! async workers never stall on a large document.
//!
//! ## Binding
//!
//! `PDFIUM_LIB_PATH` may name the library file itself or the directory that
//! holds it; otherwise the system library is used.

use crate::error::{ExtractError, StudyGenError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium, preferring `PDFIUM_LIB_PATH` over the system library.
pub fn bind_pdfium() -> Result<Pdfium, StudyGenError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            let path = PathBuf::from(raw.trim());
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_system_library(),
    };
    bindings
        .map(Pdfium::new)
        .map_err(|e| StudyGenError::PdfiumBindingFailed(format!("{e:?}")))
}

fn load_document<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, StudyGenError> {
    pdfium.load_pdf_from_file(path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            StudyGenError::PasswordRequired {
                path: path.to_path_buf(),
            }
        } else {
            StudyGenError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Raw text layer of every page, in page order.
///
/// A page whose text layer cannot be read yields an empty string so the
/// quality gate can route it to OCR.
pub async fn extract_page_texts(pdf_path: &Path) -> Result<Vec<String>, StudyGenError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_page_texts_blocking(&path))
        .await
        .map_err(|e| StudyGenError::Internal(format!("Text extraction task panicked: {}", e)))?
}

fn extract_page_texts_blocking(pdf_path: &Path) -> Result<Vec<String>, StudyGenError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, pdf_path)?;
    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let texts = pages
        .iter()
        .enumerate()
        .map(|(idx, page)| match page.text() {
            Ok(text) => text.all(),
            Err(e) => {
                warn!("Page {}: text layer unreadable ({:?})", idx + 1, e);
                String::new()
            }
        })
        .collect();
    Ok(texts)
}

/// Rasterise one page (1-indexed) with its longest edge capped at
/// `max_pixels`.
pub async fn render_page(
    pdf_path: &Path,
    page_number: usize,
    max_pixels: u32,
) -> Result<DynamicImage, ExtractError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || render_page_blocking(&path, page_number, max_pixels))
        .await
        .map_err(|e| ExtractError::Render {
            page: page_number,
            detail: format!("render task panicked: {e}"),
        })?
}

fn render_page_blocking(
    pdf_path: &Path,
    page_number: usize,
    max_pixels: u32,
) -> Result<DynamicImage, ExtractError> {
    let render_err = |detail: String| ExtractError::Render {
        page: page_number,
        detail,
    };

    let pdfium = bind_pdfium().map_err(|e| render_err(e.to_string()))?;
    let document = load_document(&pdfium, pdf_path).map_err(|e| render_err(e.to_string()))?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;

    if page_number == 0 || page_number > total_pages {
        return Err(render_err(format!(
            "page out of range (total={})",
            total_pages
        )));
    }

    let page = pages
        .get((page_number - 1) as u16)
        .map_err(|e| render_err(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| render_err(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_number,
        image.width(),
        image.height()
    );
    Ok(image)
}
