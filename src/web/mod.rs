// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web UI for the upload → result flow
//!
//! The browser posts the selected file here; the page is rendered from the
//! controller's [`ViewState`] and refreshes itself while a scan is running.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::config::AppConfig;
use crate::controller::{Controller, Phase};
use crate::ui::{Screen, Style, ViewState};
use crate::upload::ImageUpload;

/// Multipart framing on top of the image itself
const FORM_OVERHEAD: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub controller: Arc<Controller<ViewState>>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, classifier: Arc<dyn Classifier>) -> Self {
        let controller = Controller::new(ViewState::new(), classifier)
            .with_policy(config.upload.clone());
        Self {
            controller: Arc::new(controller),
            config,
        }
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.config.upload.max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    Router::new()
        // Pages
        .route("/", get(index_page))
        .route("/upload", post(upload))
        .route("/reset", post(reset))
        // API endpoints
        .route("/api/state", get(api_get_state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

// === Page Handlers ===

async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let (screen, alerts) = state
        .controller
        .with_surface(|view| (view.screen.clone(), view.take_alerts()))
        .await;

    Html(render_index(&screen, &alerts, &state.config.classifier.field_name))
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let field_name = &state.config.classifier.field_name;

    let upload = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return (StatusCode::BAD_REQUEST, format!("Missing form field '{}'", field_name))
                    .into_response()
            }
            Err(e) => return multipart_failure(&state, e).await,
        };

        if field.name() != Some(field_name.as_str()) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let declared = field.content_type().map(str::to_string);
        match field.bytes().await {
            Ok(bytes) => {
                break ImageUpload::with_declared_type(file_name, declared.as_deref(), bytes.to_vec())
            }
            Err(e) => return multipart_failure(&state, e).await,
        }
    };

    info!("Received {} ({} bytes)", upload.file_name, upload.len());
    if state.controller.submit(upload).await.is_none() {
        debug!("Upload refused by the upload policy");
    }

    Redirect::to("/").into_response()
}

/// An over-limit body goes through the rejection path; anything else is a bad request
async fn multipart_failure(state: &AppState, e: MultipartError) -> Response {
    if e.status() != StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Malformed upload: {}", e);
        return (StatusCode::BAD_REQUEST, e.body_text()).into_response();
    }

    state
        .controller
        .reject(format!(
            "File is too large, limit is {} bytes",
            state.config.upload.max_bytes
        ))
        .await;
    Redirect::to("/").into_response()
}

async fn reset(State(state): State<Arc<AppState>>) -> Redirect {
    state.controller.reset().await;
    Redirect::to("/")
}

// === API Handlers ===

#[derive(Serialize)]
struct StateResponse {
    phase: Phase,
    classifier: &'static str,
    view: ViewState,
}

async fn api_get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        phase: state.controller.phase().await,
        classifier: state.controller.classifier().name(),
        view: state.controller.snapshot().await,
    })
}

// === Template Rendering ===

fn base_template(title: &str, head_extra: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    {}
    <title>{} - oralscan</title>
    <style>
        :root {{
            --bg-primary: #1a1a2e;
            --bg-secondary: #16213e;
            --bg-card: #0f3460;
            --text-primary: #e8e8e8;
            --text-secondary: #a0a0a0;
            --accent: #e94560;
            --success: #00d9a5;
            --border: #2a2a4a;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }}
        .container {{
            max-width: 1100px;
            margin: 0 auto;
            padding: 20px;
            display: grid;
            grid-template-columns: 1fr 1fr;
            gap: 20px;
        }}
        nav {{
            background: var(--bg-secondary);
            padding: 15px 20px;
            border-bottom: 1px solid var(--border);
        }}
        nav .logo {{
            font-size: 1.5em;
            font-weight: bold;
            color: var(--accent);
            text-decoration: none;
        }}
        .card {{
            background: var(--bg-card);
            border-radius: 12px;
            padding: 20px;
        }}
        .upload-box {{
            border: 2px dashed var(--border);
            border-radius: 12px;
            min-height: 320px;
            align-items: center;
            justify-content: center;
            flex-direction: column;
            cursor: pointer;
        }}
        .upload-box label {{ cursor: pointer; padding: 120px 40px; }}
        .upload-box input {{ display: none; }}
        .preview-box {{ position: relative; overflow: hidden; border-radius: 12px; }}
        .preview-box img {{ width: 100%; display: block; }}
        .scanner {{
            position: absolute;
            left: 0; right: 0; top: 0;
            height: 4px;
            background: var(--success);
            box-shadow: 0 0 12px var(--success);
            animation: scan 2s linear infinite;
        }}
        @keyframes scan {{ from {{ top: 0; }} to {{ top: 100%; }} }}
        .result-state h2 {{ font-size: 2.5em; }}
        .result-state.is-danger h2 {{ color: var(--accent); }}
        .result-state.is-safe h2 {{ color: var(--success); }}
        .confidence {{ color: var(--text-secondary); margin-top: 10px; }}
        button {{
            margin-top: 20px;
            background: var(--accent);
            color: white;
            border: none;
            border-radius: 6px;
            padding: 8px 16px;
            cursor: pointer;
        }}
    </style>
</head>
<body>
    <nav>
        <a href="/" class="logo">oralscan</a>
    </nav>
    <main class="container">
        {}
    </main>
</body>
</html>"#, head_extra, title, content)
}

fn display(visible: bool, shown_as: &str) -> String {
    format!("display: {}", if visible { shown_as } else { "none" })
}

fn render_index(screen: &Screen, alerts: &[String], field_name: &str) -> String {
    let v = &screen.visible;

    let mut result_classes = vec!["result-state"];
    if screen.is_danger {
        result_classes.push(Style::Danger.css_class());
    }
    if screen.is_safe {
        result_classes.push(Style::Safe.css_class());
    }

    let content = format!(r#"
        <div class="card">
            <form id="uploadBox" class="upload-box" style="{}" action="/upload" method="post"
                  enctype="multipart/form-data">
                <label for="fileInput">Click to upload an image</label>
                <input id="fileInput" type="file" name="{}" accept="image/*" onchange="this.form.submit()">
            </form>
            <div id="previewBox" class="preview-box" style="{}">
                <img id="imagePreview" src="{}" alt="{}">
                <div id="scannerOverlay" class="scanner" style="{}"></div>
            </div>
        </div>
        <div class="card">
            <div id="introText" style="{}">
                <h1>Oral Lesion Screening</h1>
                <p>Upload a photo of the lesion. The image is sent to the local inference
                   server and classified as positive or negative.</p>
            </div>
            <div id="analysisPanel" style="{}">
                <div id="loadingState" style="{}">
                    <h2>Extracting Features...</h2>
                </div>
                <div id="resultState" class="{}" style="{}">
                    <h2 id="resultTitle">{}</h2>
                    <p id="resultDesc">{}</p>
                    <p class="confidence">Confidence: <span id="confidenceValue">{}</span></p>
                    <form action="/reset" method="post"><button type="submit">Analyze another image</button></form>
                </div>
            </div>
        </div>
        {}
    "#,
        display(v.upload_box, "flex"),
        escape_html(field_name),
        display(v.preview_box, "block"),
        escape_html(screen.preview.as_deref().unwrap_or("")),
        escape_html(screen.file_name.as_deref().unwrap_or("")),
        display(v.scanner_overlay, "block"),
        display(v.intro_text, "block"),
        display(v.analysis_panel, "block"),
        display(v.loading_state, "block"),
        result_classes.join(" "),
        display(v.result_state, "block"),
        escape_html(&screen.result_title),
        escape_html(&screen.result_desc),
        escape_html(&screen.confidence_value),
        render_alerts(alerts),
    );

    // Poll while the classifier is working
    let head_extra = if v.loading_state {
        r#"<meta http-equiv="refresh" content="1">"#
    } else {
        ""
    };

    base_template("Analyze", head_extra, &content)
}

fn render_alerts(alerts: &[String]) -> String {
    alerts
        .iter()
        .map(|message| {
            let literal = serde_json::to_string(message)
                .unwrap_or_else(|_| "\"\"".to_string())
                .replace("</", "<\\/");
            format!("<script>alert({});</script>", literal)
        })
        .collect()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Start the web server with config and classifier
pub async fn start_server(config: AppConfig, classifier: Arc<dyn Classifier>) -> crate::Result<()> {
    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState::new(config, classifier));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web UI available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router).await
        .map_err(|e| crate::ScanError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
