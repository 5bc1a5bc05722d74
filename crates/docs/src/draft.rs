//! Per-file MDX pages for a Starlight documentation site.

use crate::error::{ErrorKind, Result};
use crate::generator::{Generator, Request};
use crate::memo::{Memoized, memoize};
use crate::text::{add_frontmatter, code_fence, to_capital_case};
use crate::{MAX_GENERATE_CONCURRENCY, Options, Workspace, module_stem, selected_dirs};
use bru_cache::{CacheKey, CopyEvent, CopySummary, ExtensionMap, Invalidated, copy_selected};
use bru_config::{GeneratorConfig, PackageManager};
use bru_storage::BackendHandle;
use exn::ResultExt;
use futures::{StreamExt, TryStreamExt, pin_mut, stream};
use std::path::PathBuf;
use tracing::instrument;

/// Config document the draft generator remembers its answers in.
pub const DRAFT_CONFIG: &str = "draft";
/// Variant extension of cached pages.
pub const MDX_EXTENSION: &str = ".mdx";

const DEFAULT_CLONE_DIR: &str = "web";
const DEFAULT_TEMPLATE: &str = "starlight";

const SYSTEM: &str = "You are an expert technical writer specializing in Markdown and MDX documentation. Your task \
is to generate clear, accurate, and well-structured MDX documentation for the given file.

The MDX document should include the following sections:
- **Purpose**: Briefly describe the purpose of the module and its high-level functionality.
- **Features**: List the key features of the module concisely.
- **Usage**: Provide a simple code example demonstrating the most common use case.
- **Parameters**: Describe important parameters, including data types and default values.
- **Example**: Include a minimal, illustrative example of how to use the module effectively.

You may use the built-in components from '@astrojs/starlight/components' (Tabs, TabItem, Card, CardGrid, \
LinkCard, Aside, Code, FileTree, Steps) and no others. Component imports come at the very start of the response.
Do not include a title for the document. Do not wrap the response in a markdown or mdx code fence; only use code \
fences for code examples. Avoid lengthy introductions or conclusions.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReport {
    /// Content directory the pages were published into.
    pub output_dir: PathBuf,
    pub files: usize,
    /// Pages that were not already cached.
    pub generated: usize,
    pub copy: CopySummary,
    /// Outcome of `--cache-remove`, if one was requested and succeeded.
    pub removed: Option<Invalidated>,
}

fn request(key: &CacheKey, source: &str) -> Request {
    Request {
        system: SYSTEM.to_string(),
        prompt: format!(
            "Using the content provided below, create an MDX file that describes the module and its functionality for \
             the file \"{key}\". Include sections on usage and parameters based on the actual contents of the file: {}",
            code_fence(source, "ts")
        ),
        max_tokens: 850,
        temperature: 0.45,
    }
}

/// `modules/ask/view.tsx` -> `View`, and a module's `mod.ts` is named after
/// its directory: `modules/ask/mod.ts` -> `Ask`.
fn page_title(key: &CacheKey) -> String {
    let stem = match module_stem(key) {
        "mod" => key.parent().rsplit('/').next().filter(|d| !d.is_empty()).unwrap_or("module"),
        stem => stem,
    };
    to_capital_case(stem)
}

async fn draft_page(workspace: &Workspace, generator: &dyn Generator, key: &CacheKey) -> Result<Memoized> {
    memoize(workspace.cache(), key, MDX_EXTENSION, move || async move {
        let source = workspace.read_source(key).await?;
        tracing::info!(key = %key, "Drafting");
        let body = generator.generate(&request(key, &source)).await?;
        Result::Ok(add_frontmatter(&body, &page_title(key), &format!("Reference for {key}")))
    })
    .await
}

/// Caches an MDX page for every source file in the selected directories,
/// then publishes the cached pages into the site's content directory.
///
/// Unset answers fall back to the previous run, then to a `web` Starlight
/// site managed with pnpm whose content lives in `web/src/content/docs`.
#[instrument(level = "debug", skip_all)]
pub async fn draft(workspace: &Workspace, generator: &dyn Generator, options: Options) -> Result<DraftReport> {
    let removed = match &options.cache_remove {
        Some(raw) => workspace.remove_requested(raw, MDX_EXTENSION).await,
        None => None,
    };

    let remembered = GeneratorConfig::read(workspace.cache_root(), DRAFT_CONFIG);
    let clone_dir = remembered.clone_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CLONE_DIR));
    let output_dir = options
        .output_dir
        .or(remembered.output_dir)
        .unwrap_or_else(|| clone_dir.join("src/content/docs"));
    let selected = selected_dirs(options.selected_dirs, remembered.selected_dirs)?;
    GeneratorConfig {
        clone_dir: Some(clone_dir),
        output_dir: Some(output_dir.clone()),
        template: Some(remembered.template.unwrap_or_else(|| DEFAULT_TEMPLATE.to_string())),
        dir_name: remembered.dir_name,
        selected_dirs: Some(selected.clone()),
        manager: Some(remembered.manager.unwrap_or(PackageManager::Pnpm)),
    }
    .write(workspace.cache_root(), DRAFT_CONFIG)
    .await
    .or_raise(|| ErrorKind::Config)?;

    let directories = workspace.normalize(&selected)?;
    let keys = workspace.discover(&directories).await?;
    let pages: Vec<Memoized> = stream::iter(&keys)
        .map(|key| draft_page(workspace, generator, key))
        .buffered(MAX_GENERATE_CONCURRENCY)
        .try_collect()
        .await?;
    let generated = pages.iter().filter(|page| page.was_generated()).count();

    let (root, output) = workspace.output(&output_dir)?;
    let map = ExtensionMap::default().with(".ts", MDX_EXTENSION).with(".tsx", MDX_EXTENSION);
    let copy = publish(workspace, &output, &selected, &map).await?;
    tracing::info!(output_dir = %root.display(), files = keys.len(), generated, copied = copy.copied, "Drafted documentation");

    Ok(DraftReport { output_dir: root, files: keys.len(), generated, copy, removed })
}

async fn publish(
    workspace: &Workspace,
    output: &BackendHandle,
    selected: &[PathBuf],
    map: &ExtensionMap,
) -> Result<CopySummary> {
    let events = copy_selected(workspace.cache(), output, workspace.root(), selected, map);
    pin_mut!(events);
    let mut summary = CopySummary::default();
    while let Some(event) = events.try_next().await.or_raise(|| ErrorKind::Cache)? {
        match event {
            CopyEvent::Started(directories) => tracing::debug!(?directories, "Publishing pages"),
            CopyEvent::DirectoryCopied { directory, copied, skipped } => {
                tracing::debug!(directory = %directory, copied, skipped, "Published directory");
            },
            CopyEvent::Complete(complete) => summary = complete,
        }
    }
    Ok(summary)
}
