//! Content generation: ask the configured text-generation provider for a
//! file set, fall back to the built-in template when the provider is absent
//! or unusable, and materialize the result into the working tree.
//!
//! The generator never fails: every expected failure mode of the provider
//! call (network error, non-success status, unparseable body, wrong content
//! shape) is caught, logged with its own message, and degrades to the
//! fallback. Only writing the files to disk can fail, and that surfaces to
//! the orchestrator as a fatal error.

use std::fs;
use std::path::{Component, Path};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::contract::{Attachment, GeneratedFile};

const LLM_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = r#"You write minimal static web apps. Return JSON: {"files":[{"path","content"}]}.
Must: read ?url= for an image, show it, run Tesseract.js OCR, print text within 15s, responsive UI."#;

/// Relative path of the CI workflow descriptor inside the working tree.
pub const PAGES_WORKFLOW_PATH: &str = ".github/workflows/pages.yml";

/// Workflow descriptor published with every artifact: on push to the default
/// branch, upload the working tree as a pages artifact and deploy it.
pub const PAGES_WORKFLOW: &str = r#"name: Deploy to GitHub Pages
on:
  push:
    branches: ["main"]
permissions:
  contents: read
  pages: write
  id-token: write
concurrency:
  group: "pages"
  cancel-in-progress: true
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - name: Checkout
        uses: actions/checkout@v4
      - name: Upload artifact
        uses: actions/upload-pages-artifact@v3
        with:
          path: .
  deploy:
    needs: build
    runs-on: ubuntu-latest
    permissions:
      pages: write
      id-token: write
    environment:
      name: github-pages
      url: ${{ steps.deployment.outputs.page_url }}
    steps:
      - name: Deploy to GitHub Pages
        id: deployment
        uses: actions/deploy-pages@v4
"#;

const FALLBACK_HTML: &str = r#"<!doctype html>
<html lang="en"><meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1"/>
<title>Captcha Solver</title>
<link rel="stylesheet" href="styles.css"/>
<body><main>
<h1>Captcha Solver</h1>
<p>Pass an image via <code>?url=</code>. If absent, a sample is used.</p>
<img id="img" alt="captcha"/>
<pre id="result">Solving...</pre>
</main>
<script src="https://cdn.jsdelivr.net/npm/tesseract.js@5/dist/tesseract.min.js"></script>
<script>
const q=new URLSearchParams(location.search);
const url=q.get('url')||"{DEFAULT_URL}";
const result=document.getElementById('result');
const deadline=setTimeout(()=>{result.textContent='(timed out after 15s)';},15000);
document.getElementById('img').src=url;
Tesseract.recognize(url,'eng',{logger:m=>console.log(m)}).then(({data})=>{
  clearTimeout(deadline);
  result.textContent=(data.text||'').trim()||'(no text found)';
}).catch(e=>{clearTimeout(deadline);result.textContent='Error: '+e;});
</script></body></html>
"#;

const FALLBACK_CSS: &str = "body{font-family:system-ui;margin:16px}main{max-width:720px;margin:auto}img{max-width:100%;border:1px solid #ddd;border-radius:8px}pre{background:#111;color:#0f0;padding:12px;border-radius:8px;white-space:pre-wrap}\n";

/// Shape the provider's message content must parse into.
#[derive(Debug, Deserialize)]
struct FileList {
    files: Vec<GeneratedFile>,
}

/// Ask the generation provider for a file set. Returns `None` whenever the
/// provider is unconfigured or its answer is unusable; each failure mode is
/// logged distinguishably so genuine bugs stay visible in the logs.
pub async fn call_llm(
    client: &reqwest::Client,
    llm: Option<&LlmConfig>,
    brief: &str,
) -> Option<Vec<GeneratedFile>> {
    let llm = match llm {
        Some(llm) => llm,
        None => {
            info!("No generation provider configured, using fallback template");
            return None;
        }
    };

    let url = format!("{}/chat/completions", llm.base_url.trim_end_matches('/'));
    let payload = serde_json::json!({
        "model": llm.model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": format!("Brief: {brief}\nFiles: index.html, styles.css (optional)")}
        ],
        "temperature": 0.3
    });

    let response = match client
        .post(&url)
        .bearer_auth(&llm.api_key)
        .timeout(LLM_TIMEOUT)
        .json(&payload)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, url = %url, "Generation call failed before a response arrived");
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Generation provider returned non-success status");
        return None;
    }

    let body: serde_json::Value = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Generation response body is not valid JSON");
            return None;
        }
    };

    let content = match body
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
    {
        Some(content) => content,
        None => {
            warn!("Generation response is missing choices[0].message.content");
            return None;
        }
    };

    match serde_json::from_str::<FileList>(content) {
        Ok(list) => {
            info!(files = list.files.len(), "Parsed generated file list");
            Some(list.files)
        }
        Err(e) => {
            warn!(error = %e, "Generation content does not match the expected file-list shape");
            None
        }
    }
}

/// The deterministic built-in file set: an OCR page wired to `?url=` (with
/// `default_url` as the fallback image) and its stylesheet.
pub fn fallback_template(default_url: &str) -> Vec<GeneratedFile> {
    vec![
        GeneratedFile {
            path: "index.html".to_string(),
            content: FALLBACK_HTML.replace("{DEFAULT_URL}", default_url),
        },
        GeneratedFile {
            path: "styles.css".to_string(),
            content: FALLBACK_CSS.to_string(),
        },
    ]
}

/// Combine provider output (if any) with the unconditional CI workflow
/// descriptor. An empty or absent provider file list selects the fallback;
/// the descriptor is appended in every case, so provider output cannot omit
/// it.
pub fn assemble(llm_files: Option<Vec<GeneratedFile>>, default_url: &str) -> Vec<GeneratedFile> {
    let mut files = match llm_files {
        Some(files) if !files.is_empty() => files,
        _ => fallback_template(default_url),
    };
    files.push(GeneratedFile {
        path: PAGES_WORKFLOW_PATH.to_string(),
        content: PAGES_WORKFLOW.to_string(),
    });
    files
}

/// Write the file set under `work_dir`, creating parent directories as
/// needed. Entries are written in order, so a later duplicate path
/// overwrites an earlier one. Paths that would resolve outside the working
/// tree (absolute, or containing `..`) are skipped with a warning.
pub fn materialize(work_dir: &Path, files: &[GeneratedFile]) -> std::io::Result<()> {
    fs::create_dir_all(work_dir)?;
    for file in files {
        let rel = Path::new(&file.path);
        if !is_tree_relative(rel) {
            warn!(path = %file.path, "Skipping generated file whose path would escape the working tree");
            continue;
        }
        let target = work_dir.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.content)?;
        debug!(path = %target.display(), bytes = file.content.len(), "Wrote generated file");
    }
    Ok(())
}

fn is_tree_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Produce the artifact for one request: provider output or fallback, plus
/// the workflow descriptor, written into `work_dir`.
pub async fn materialize_app(
    client: &reqwest::Client,
    llm: Option<&LlmConfig>,
    work_dir: &Path,
    brief: &str,
    attachments: &[Attachment],
) -> std::io::Result<()> {
    let default_url = attachments.first().map(|a| a.url.as_str()).unwrap_or("");
    let llm_files = call_llm(client, llm, brief).await;
    let files = assemble(llm_files, default_url);
    materialize(work_dir, &files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_paths() {
        assert!(!is_tree_relative(Path::new("../outside.html")));
        assert!(!is_tree_relative(Path::new("a/../../outside.html")));
        assert!(!is_tree_relative(Path::new("/etc/passwd")));
        assert!(!is_tree_relative(Path::new("")));
        assert!(is_tree_relative(Path::new("index.html")));
        assert!(is_tree_relative(Path::new(".github/workflows/pages.yml")));
        assert!(is_tree_relative(Path::new("./assets/app.js")));
    }
}
