//! 远程文档来源
//!
//! 并发下载阅读顺序中的每个文档，并从中发现样式表、图片、音视频等资源继续下载。
//! 所有下载任务放在同一个 `JoinSet` 中，全部结束（成功或失败）后才返回；
//! 归档写入只在收集结果的循环中进行，因此写入是串行的。

use crate::epub::config::HeadingSelector;
use crate::epub::error::{Diagnostic, EpubError, Result};
use crate::epub::source::package_href;
use crate::epub::toc::Page;
use crate::epub::writer::{ArchiveSink, PackageAssembler};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 样式中的 `url(...)` 引用
static CSS_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*['"]?([^'")]*)['"]?\s*\)"#).unwrap());

const USER_AGENT: &str = concat!("html2epub/", env!("CARGO_PKG_VERSION"));

/// 下载接口
pub trait Fetcher: Send + Sync + 'static {
    /// 下载一个URL的完整内容
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// 基于reqwest的HTTP下载器
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EpubError::ConfigError(format!("无法创建HTTP客户端: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let failed = |reason: String| EpubError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let parsed = Url::parse(url).map_err(|e| failed(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(EpubError::UnsupportedSource(url.to_string()));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status().as_u16())));
        }

        let body = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// 下载策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// 单次请求超时
    pub timeout: Duration,
    /// 失败后的重试次数
    pub retries: u32,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 2,
        }
    }
}

/// 远程转换的结果
#[derive(Debug, Default)]
pub struct RemoteOutcome {
    /// 成功下载的文档，按阅读顺序排列
    pub pages: Vec<Page>,
    /// 成功下载的文档在包内的路径，按阅读顺序排列
    pub spine: Vec<String>,
    /// 成功下载的资源在包内的路径（已排序）
    pub resources: Vec<String>,
    /// 发出的下载请求数（不含重试）
    pub requests: usize,
    pub diagnostics: Vec<Diagnostic>,
}

enum Job {
    Document(usize),
    Resource,
}

struct Fetched {
    url: String,
    job: Job,
    result: Result<Vec<u8>>,
}

/// 远程下载协调器
pub struct RemoteCoordinator<F: Fetcher> {
    fetcher: Arc<F>,
    policy: FetchPolicy,
    selector: HeadingSelector,
    keep_all_headings: bool,
    cancellation: CancellationToken,
}

impl<F: Fetcher> RemoteCoordinator<F> {
    pub fn new(fetcher: F, selector: HeadingSelector, keep_all_headings: bool) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            policy: FetchPolicy::default(),
            selector,
            keep_all_headings,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// 用于从外部取消本次下载
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// 下载所有文档及其资源，并写入归档
    ///
    /// 下载失败按重试策略处理后记为诊断信息，不会阻塞其余任务。
    /// 取消时中止所有未完成的下载并返回 [`EpubError::Cancelled`]。
    pub async fn run<S: ArchiveSink>(
        &self,
        spine: &[String],
        assembler: &mut PackageAssembler<S>,
    ) -> Result<RemoteOutcome> {
        if self.cancellation.is_cancelled() {
            return Err(EpubError::Cancelled);
        }

        let mut outcome = RemoteOutcome::default();
        let mut slots: Vec<Option<Page>> = vec![None; spine.len()];
        let mut requested: HashSet<String> = HashSet::new();
        let mut resources = Vec::new();
        let mut tasks = JoinSet::new();

        for (index, url) in spine.iter().enumerate() {
            let url = normalize_url(url).unwrap_or_else(|| url.clone());
            requested.insert(url.clone());
            info!("下载文档: {}", url);
            self.spawn(&mut tasks, url, Job::Document(index));
            outcome.requests += 1;
        }

        loop {
            let joined = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    tasks.abort_all();
                    warn!("下载已取消，剩余 {} 个任务被中止", tasks.len());
                    return Err(EpubError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else {
                break;
            };
            let fetched = match joined {
                Ok(fetched) => fetched,
                Err(join_err) => {
                    if !join_err.is_cancelled() {
                        warn!("下载任务异常退出: {}", join_err);
                    }
                    continue;
                }
            };

            let data = match fetched.result {
                Ok(data) => data,
                Err(e) => {
                    let diagnostic = Diagnostic::FetchFailed {
                        url: fetched.url,
                        reason: e.to_string(),
                    };
                    diagnostic.emit();
                    outcome.diagnostics.push(diagnostic);
                    continue;
                }
            };

            let href = package_href(&fetched.url);
            match fetched.job {
                Job::Document(index) => {
                    let markup = String::from_utf8_lossy(&data);
                    let page = Page::from_markup(&href, &markup, &self.selector, self.keep_all_headings)?;
                    for resource in discover_resources(&fetched.url, &markup) {
                        if requested.insert(resource.clone()) {
                            info!("下载资源: {}", resource);
                            self.spawn(&mut tasks, resource, Job::Resource);
                            outcome.requests += 1;
                        }
                    }
                    slots[index] = Some(page);
                }
                Job::Resource => resources.push(href.clone()),
            }
            assembler.append(&href, &data)?;
        }

        for page in slots.into_iter().flatten() {
            outcome.spine.push(page.href.clone());
            outcome.pages.push(page);
        }
        resources.sort();
        outcome.resources = resources;

        debug!(
            "下载完成: {} 个文档, {} 个资源, {} 个失败",
            outcome.pages.len(),
            outcome.resources.len(),
            outcome.diagnostics.len()
        );
        Ok(outcome)
    }

    fn spawn(&self, tasks: &mut JoinSet<Fetched>, url: String, job: Job) {
        let fetcher = Arc::clone(&self.fetcher);
        let policy = self.policy;
        let token = self.cancellation.clone();
        tasks.spawn(async move {
            let result = fetch_with_retry(fetcher.as_ref(), &url, policy, &token).await;
            Fetched { url, job, result }
        });
    }
}

/// 带超时和有限重试的下载
async fn fetch_with_retry<F: Fetcher>(
    fetcher: &F,
    url: &str,
    policy: FetchPolicy,
    token: &CancellationToken,
) -> Result<Vec<u8>> {
    let mut last_error = EpubError::Cancelled;
    for attempt in 0..=policy.retries {
        if token.is_cancelled() {
            return Err(EpubError::Cancelled);
        }
        if attempt > 0 {
            debug!("重试 {} (第{}次)", url, attempt);
        }

        match tokio::time::timeout(policy.timeout, fetcher.fetch(url)).await {
            Ok(Ok(data)) => return Ok(data),
            Ok(Err(EpubError::UnsupportedSource(source))) => {
                return Err(EpubError::UnsupportedSource(source));
            }
            Ok(Err(e)) => last_error = e,
            Err(_) => {
                last_error = EpubError::FetchFailed {
                    url: url.to_string(),
                    reason: format!("超时 ({}秒)", policy.timeout.as_secs()),
                }
            }
        }
    }
    Err(last_error)
}

/// 解析为绝对URL并去掉片段；非http(s) URL返回None
fn normalize_url(url: &str) -> Option<String> {
    let mut url = Url::parse(url).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// 发现文档引用的资源：`<style>` 中的 `url()`、`img`/`audio`/`video` 的 `src`、
/// 以及 `link[rel=stylesheet]` 的 `href`
///
/// 相对地址按 `<base href>`（若存在）或文档自身的URL解析，结果为去重后的绝对URL。
pub fn discover_resources(document_url: &str, markup: &str) -> Vec<String> {
    let Ok(document_url) = Url::parse(document_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(markup);

    let base = selector("base[href]")
        .and_then(|s| document.select(&s).last())
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| document_url.join(href).ok())
        .unwrap_or(document_url);

    let mut references: Vec<String> = Vec::new();
    if let Some(style) = selector("style") {
        for element in document.select(&style) {
            let css: String = element.text().collect();
            references.extend(CSS_URL.captures_iter(&css).map(|c| c[1].trim().to_string()));
        }
    }
    if let Some(media) = selector("img[src], audio[src], video[src]") {
        references.extend(
            document
                .select(&media)
                .filter_map(|e| e.value().attr("src"))
                .map(str::to_string),
        );
    }
    if let Some(links) = selector("link[rel=stylesheet][href]") {
        references.extend(
            document
                .select(&links)
                .filter_map(|e| e.value().attr("href"))
                .map(str::to_string),
        );
    }

    let mut seen = HashSet::new();
    references
        .iter()
        .filter(|r| !r.is_empty())
        .filter_map(|r| base.join(r).ok())
        .filter_map(|url| normalize_url(url.as_str()))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
