//! End-to-end `ask` pipeline: query → sources → PDFs → text → context → answer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument};

use askweb_document::{TextExtractor, merge_pdfs};
use askweb_model::AnswerModel;
use askweb_render::{PageRenderer, PrintOptions};
use askweb_search::SearchClient;
use askweb_shared::{AppConfig, AskWebError, ExtractedText, Result, Selection};

use crate::budget::budget;
use crate::relevance::RelevanceScorer;
use crate::stopwords::Stopwords;
use crate::window::ChunkWindow;
use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// Settings and results
// ---------------------------------------------------------------------------

/// Pipeline knobs resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub relevance_threshold: f64,
    pub max_context_chars: usize,
    pub scratch_root: PathBuf,
    pub keep_scratch: bool,
    pub render_timeout: Duration,
    pub print_options: PrintOptions,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            relevance_threshold: config.pipeline.relevance_threshold,
            max_context_chars: config.pipeline.max_context_chars,
            scratch_root: config.pipeline.scratch_root(),
            keep_scratch: config.pipeline.keep_scratch,
            render_timeout: Duration::from_secs(config.render.timeout_secs),
            print_options: PrintOptions::default().with_overrides(&config.render.print_options),
        }
    }
}

/// How the context handed to the model was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerMode {
    /// Web chunks filtered by relevance to a reference document.
    WithDocument,
    /// Overlapping paragraph windows of the web text.
    WithoutDocument,
}

/// Result of one `answer` run.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The model's answer, unmodified.
    pub text: String,
    pub mode: AnswerMode,
    /// Sources used, in acceptance order.
    pub sources: Selection,
    /// Length of the context sent to the model.
    pub context_chars: usize,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each source is rendered.
    fn source_rendered(&self, url: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, answer: &Answer);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_rendered(&self, _url: &str, _current: usize, _total: usize) {}
    fn done(&self, _answer: &Answer) {}
}

// ---------------------------------------------------------------------------
// ContextPipeline
// ---------------------------------------------------------------------------

/// Answers questions from web sources through a renderer, extractor and model.
pub struct ContextPipeline<R, E, M> {
    search: SearchClient,
    renderer: R,
    extractor: E,
    model: M,
    stopwords: Stopwords,
    window: ChunkWindow,
    settings: PipelineSettings,
}

impl<R, E, M> ContextPipeline<R, E, M>
where
    R: PageRenderer,
    E: TextExtractor,
    M: AnswerModel,
{
    /// Build the pipeline. `model` must already be initialized.
    ///
    /// Fails on an invalid search endpoint, invalid window parameters, or an
    /// unreadable stopword file.
    pub fn new(config: &AppConfig, renderer: R, extractor: E, model: M) -> Result<Self> {
        let search = SearchClient::new(&config.search)?;
        let window = ChunkWindow::new(config.pipeline.chunk_size, config.pipeline.chunk_overlap)
            .map_err(|e| AskWebError::config(format!("[pipeline] {e}")))?;
        let stopwords = Stopwords::load(config.pipeline.stopwords_path.as_deref())?;

        Ok(Self {
            search,
            renderer,
            extractor,
            model,
            stopwords,
            window,
            settings: PipelineSettings::from_config(config),
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run a full query.
    ///
    /// 1. Select up to `urls_count` distinct-domain sources
    /// 2. Render each to PDF in a fresh workspace
    /// 3. Merge in acceptance order and extract the text
    /// 4. Build the context (relevance-filtered if `reference` is given)
    /// 5. Ask the model once
    #[instrument(skip_all, fields(query = %query, urls_count = urls_count, reference = reference.is_some()))]
    pub async fn answer(
        &self,
        query: &str,
        reference: Option<&Path>,
        urls_count: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<Answer> {
        info!("starting ask pipeline");

        progress.phase("Searching the web");
        let sources = self.search.top_urls(query, urls_count).await;
        info!(sources = sources.len(), "sources selected");

        let workspace = Workspace::create(&self.settings.scratch_root, self.settings.keep_scratch)?;
        let web = self.collect_web_text(&sources, &workspace, progress).await?;

        let (text, mode, context_chars) = match reference {
            Some(path) => {
                progress.phase("Reading reference document");
                let reference = self.extractor.extract(path, &workspace.reference_text())?;
                progress.phase("Asking the model");
                let (text, chars) = self
                    .with_document(query, &web.full_text, &reference.full_text)
                    .await?;
                (text, AnswerMode::WithDocument, chars)
            }
            None => {
                progress.phase("Asking the model");
                let (text, chars) = self.without_document(query, &web.paragraphs).await?;
                (text, AnswerMode::WithoutDocument, chars)
            }
        };

        let answer = Answer {
            text,
            mode,
            sources,
            context_chars,
        };
        progress.done(&answer);

        info!(
            mode = ?answer.mode,
            context_chars = answer.context_chars,
            "ask pipeline complete"
        );
        Ok(answer)
    }

    /// Answer from web chunks relevant to a reference document.
    ///
    /// `web_text` is split on newlines; chunks scoring at least the threshold
    /// against `reference_text` are concatenated in order, budgeted, and sent
    /// to the model. Returns the answer and the context length.
    pub async fn with_document(
        &self,
        query: &str,
        web_text: &str,
        reference_text: &str,
    ) -> Result<(String, usize)> {
        let scorer = RelevanceScorer::new(&self.stopwords);
        let scored = scorer.score_passages(
            web_text.split('\n'),
            reference_text,
            self.settings.relevance_threshold,
        );

        let accepted = scored.iter().filter(|p| p.accepted).count();
        debug!(chunks = scored.len(), accepted, "relevance filter applied");

        let joined: String = scored
            .into_iter()
            .filter(|p| p.accepted)
            .map(|p| p.text)
            .collect();
        self.ask(&joined, query).await
    }

    /// Answer from overlapping paragraph windows of the web text.
    pub async fn without_document(
        &self,
        query: &str,
        paragraphs: &[String],
    ) -> Result<(String, usize)> {
        let chunks = self.window.window(paragraphs);
        debug!(paragraphs = paragraphs.len(), chunks = chunks.len(), "windowed paragraphs");

        let joined: String = chunks.concat();
        self.ask(&joined, query).await
    }

    async fn ask(&self, joined: &str, query: &str) -> Result<(String, usize)> {
        let context = budget(joined, self.settings.max_context_chars);
        let context_chars = context.chars().count();
        debug!(context_chars, "context assembled");

        let text = self.model.answer(context, query).await?;
        Ok((text, context_chars))
    }

    /// Render, merge and extract every source. No sources means no text.
    async fn collect_web_text(
        &self,
        sources: &Selection,
        workspace: &Workspace,
        progress: &dyn ProgressReporter,
    ) -> Result<ExtractedText> {
        if sources.is_empty() {
            info!("no sources, continuing with empty web text");
            return Ok(ExtractedText::default());
        }

        progress.phase("Rendering pages");
        let total = sources.len();
        let mut rendered = Vec::with_capacity(total);

        for (i, source) in sources.iter().enumerate() {
            let bytes = self
                .renderer
                .render(&source.url, self.settings.render_timeout, &self.settings.print_options)
                .await?;

            let path = workspace.source_pdf(i, &source.domain_key);
            std::fs::write(&path, &bytes).map_err(|e| AskWebError::io(&path, e))?;
            debug!(url = %source.url, path = %path.display(), bytes = bytes.len(), "source rendered");

            progress.source_rendered(&source.url, i + 1, total);
            rendered.push(path);
        }

        progress.phase("Merging PDFs");
        let merged = workspace.merged_pdf();
        merge_pdfs(&rendered, &merged)?;

        progress.phase("Extracting text");
        self.extractor.extract(&merged, &workspace.merged_text())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    // --- Fakes ---

    /// Renders a one-page PDF that carries the source URL in its info dict.
    #[derive(Default)]
    struct FakeRenderer {
        calls: Mutex<Vec<(String, Duration)>>,
    }

    impl PageRenderer for FakeRenderer {
        async fn render(
            &self,
            source: &str,
            timeout: Duration,
            _options: &PrintOptions,
        ) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push((source.to_string(), timeout));
            Ok(one_page_pdf(source))
        }
    }

    struct FailingRenderer;

    impl PageRenderer for FailingRenderer {
        async fn render(&self, source: &str, _: Duration, _: &PrintOptions) -> Result<Vec<u8>> {
            Err(AskWebError::Render(format!("navigation failed: {source}")))
        }
    }

    /// Returns canned text; records which files it was asked to read.
    struct FakeExtractor {
        web: Vec<String>,
        reference: Vec<String>,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl FakeExtractor {
        fn new(web: Vec<String>, reference: Vec<String>) -> Self {
            Self {
                web,
                reference,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextExtractor for FakeExtractor {
        fn extract(&self, pdf: &Path, intermediate: &Path) -> Result<ExtractedText> {
            assert!(pdf.exists(), "extractor called on missing file {pdf:?}");
            self.calls.lock().unwrap().push(pdf.to_path_buf());
            let paragraphs = if pdf.ends_with("merged.pdf") {
                self.web.clone()
            } else {
                self.reference.clone()
            };
            std::fs::write(intermediate, paragraphs.join("\n")).unwrap();
            Ok(ExtractedText::from_paragraphs(paragraphs))
        }
    }

    #[derive(Default)]
    struct FakeModel {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl AnswerModel for FakeModel {
        async fn initialize(&mut self, _api_key: &str) -> Result<()> {
            Ok(())
        }

        async fn answer(&self, context: &str, question: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((context.to_string(), question.to_string()));
            Ok("  Plants make sugar from light.\n".to_string())
        }
    }

    fn one_page_pdf(label: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(label),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    const RESULTS_PAGE: &str = r#"<html><body>
        <a href="/url?q=https://en.wikipedia.org/wiki/Photosynthesis&amp;sa=U&amp;ved=1">W</a>
        <a href="/url?q=https://en.wikipedia.org/wiki/Chlorophyll&amp;sa=U&amp;ved=2">W2</a>
        <a href="/url?q=https://www.britannica.com/science/photosynthesis&amp;sa=U&amp;ved=3">B</a>
        <a href="/url?q=https://www.khanacademy.org/science/photosynthesis&amp;sa=U&amp;ved=4">K</a>
    </body></html>"#;

    async fn search_server(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer, scratch: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.search.endpoint = format!("{}/search", server.uri());
        config.pipeline.scratch_root = Some(scratch.to_path_buf());
        config
    }

    fn paragraphs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{i}")).collect()
    }

    // --- Tests ---

    #[tokio::test]
    async fn end_to_end_without_reference() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "How does photosynthesis work?"))
            .and(query_param("num", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .expect(1)
            .mount(&server)
            .await;
        let scratch = tempfile::tempdir().unwrap();
        let config = config_for(&server, scratch.path());

        let pipeline = ContextPipeline::new(
            &config,
            FakeRenderer::default(),
            FakeExtractor::new(paragraphs(25), vec![]),
            FakeModel::default(),
        )
        .unwrap();

        let answer = pipeline
            .answer("How does photosynthesis work?", None, 2, &SilentProgress)
            .await
            .unwrap();

        // Two distinct-domain sources, rendered in acceptance order.
        assert_eq!(answer.sources.domains, vec!["en", "britannica"]);
        let renders = pipeline.renderer.calls.lock().unwrap().clone();
        assert_eq!(
            renders.iter().map(|(u, _)| u.as_str()).collect::<Vec<_>>(),
            vec![
                "https://en.wikipedia.org/wiki/Photosynthesis",
                "https://www.britannica.com/science/photosynthesis",
            ]
        );
        assert!(renders.iter().all(|(_, t)| *t == Duration::from_secs(2)));

        // One merge, then one extraction of the merged file.
        let extracted = pipeline.extractor.calls.lock().unwrap().clone();
        assert_eq!(extracted.len(), 1);
        assert!(extracted[0].ends_with("merged.pdf"));

        // Windows of 10 with overlap 2, concatenated without separator.
        let expected_context = ChunkWindow::default().window(&paragraphs(25)).concat();
        let calls = pipeline.model.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, expected_context);
        assert_eq!(calls[0].1, "How does photosynthesis work?");

        assert_eq!(answer.text, "  Plants make sugar from light.\n");
        assert_eq!(answer.mode, AnswerMode::WithoutDocument);
        assert_eq!(answer.context_chars, expected_context.chars().count());

        // Workspace is gone after the run.
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn reference_mode_filters_by_relevance() {
        let server = search_server(RESULTS_PAGE).await;
        let scratch = tempfile::tempdir().unwrap();
        let config = config_for(&server, scratch.path());

        let web = vec![
            "Photosynthesis turns sunlight into glucose inside chloroplasts.".to_string(),
            "The stock market closed higher on Tuesday.".to_string(),
            "Chloroplasts contain chlorophyll that captures sunlight.".to_string(),
        ];
        let reference = vec!["Chloroplasts use sunlight and chlorophyll to make glucose.".to_string()];

        let reference_pdf = scratch.path().join("notes.pdf");
        std::fs::write(&reference_pdf, one_page_pdf("notes")).unwrap();

        let pipeline = ContextPipeline::new(
            &config,
            FakeRenderer::default(),
            FakeExtractor::new(web.clone(), reference),
            FakeModel::default(),
        )
        .unwrap();

        let answer = pipeline
            .answer("What do chloroplasts do?", Some(&reference_pdf), 1, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(answer.mode, AnswerMode::WithDocument);
        let calls = pipeline.model.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, format!("{}{}", web[0], web[2]));
        assert_eq!(pipeline.extractor.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn no_sources_still_calls_model_with_empty_context() {
        let server = search_server("<html><body>no results</body></html>").await;
        let scratch = tempfile::tempdir().unwrap();
        let config = config_for(&server, scratch.path());

        let pipeline = ContextPipeline::new(
            &config,
            FakeRenderer::default(),
            FakeExtractor::new(paragraphs(5), vec![]),
            FakeModel::default(),
        )
        .unwrap();

        let answer = pipeline.answer("anything", None, 3, &SilentProgress).await.unwrap();

        assert!(answer.sources.is_empty());
        assert!(pipeline.renderer.calls.lock().unwrap().is_empty());
        assert!(pipeline.extractor.calls.lock().unwrap().is_empty());
        let calls = pipeline.model.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(String::new(), "anything".to_string())]);
        assert_eq!(answer.context_chars, 0);
    }

    #[tokio::test]
    async fn render_failure_aborts_query() {
        let server = search_server(RESULTS_PAGE).await;
        let scratch = tempfile::tempdir().unwrap();
        let config = config_for(&server, scratch.path());

        let pipeline = ContextPipeline::new(
            &config,
            FailingRenderer,
            FakeExtractor::new(paragraphs(5), vec![]),
            FakeModel::default(),
        )
        .unwrap();

        let err = pipeline.answer("q", None, 2, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, AskWebError::Render(_)));
        assert!(pipeline.model.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn context_is_budgeted() {
        let server = search_server(RESULTS_PAGE).await;
        let scratch = tempfile::tempdir().unwrap();
        let mut config = config_for(&server, scratch.path());
        config.pipeline.max_context_chars = 50;

        let long = vec!["x".repeat(200)];
        let pipeline = ContextPipeline::new(
            &config,
            FakeRenderer::default(),
            FakeExtractor::new(long, vec![]),
            FakeModel::default(),
        )
        .unwrap();

        let (_, chars) = pipeline
            .without_document("q", &["y".repeat(120)])
            .await
            .unwrap();
        assert_eq!(chars, 50);
        assert_eq!(pipeline.model.calls.lock().unwrap()[0].0, "y".repeat(50));
    }

    #[test]
    fn invalid_window_is_config_error() {
        let mut config = AppConfig::default();
        config.pipeline.chunk_size = 2;
        config.pipeline.chunk_overlap = 2;

        let result = ContextPipeline::new(
            &config,
            FakeRenderer::default(),
            FakeExtractor::new(vec![], vec![]),
            FakeModel::default(),
        );
        assert!(matches!(result, Err(AskWebError::Config { .. })));
    }
}
