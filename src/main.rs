use clap::Parser;
use html2epub::{ConversionOutput, ConversionRequest, Converter, FetchPolicy, OutputFormat, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 📚 html2epub - 把HTML文档打包为EPUB
#[derive(Parser, Debug)]
#[command(name = "html2epub")]
#[command(about = "将一组HTML/XHTML文档（本地目录或http(s) URL）打包为EPUB电子书")]
#[command(version)]
struct Args {
    /// 阅读顺序：文件、目录或http(s) URL
    #[arg(help = "要转换的文档（文件、目录或http(s) URL），省略时使用根目录下的所有HTML文档")]
    sources: Vec<String>,

    /// 配置文件（YAML或JSON）
    #[arg(short, long, help = "配置文件路径，命令行参数会覆盖其中的值")]
    config: Option<PathBuf>,

    /// 本地文档的根目录
    #[arg(short, long, help = "本地文档的根目录")]
    basedir: Option<PathBuf>,

    /// 输出文件
    #[arg(short, long, help = "输出的EPUB文件路径")]
    output: Option<PathBuf>,

    /// 输出格式
    #[arg(short, long, value_enum, help = "输出格式：epub、opf、txt、json、ncx、xhtml")]
    format: Option<OutputFormat>,

    #[arg(long, help = "书名")]
    title: Option<String>,

    #[arg(long, help = "唯一标识符（默认随机UUID）")]
    identifier: Option<String>,

    #[arg(long, help = "生成文档的字符集")]
    charset: Option<String>,

    #[arg(long, help = "书籍语言")]
    language: Option<String>,

    #[arg(long, help = "最后修改时间（YYYY-MM-DDTHH:MM:SSZ）")]
    modified: Option<String>,

    /// 额外的Dublin Core元数据
    #[arg(long = "dc", value_name = "KEY=VALUE", value_parser = parse_key_value, help = "额外的Dublin Core元数据，如 --dc creator=作者")]
    dc: Vec<(String, String)>,

    #[arg(short, long, help = "目录深度")]
    depth: Option<usize>,

    #[arg(long, help = "标题选择器，如 h1,h2,h3 或 h2..h4")]
    headings: Option<String>,

    #[arg(long, help = "保留无法生成链接的标题")]
    keep_all_headings: bool,

    #[arg(long, help = "严格模式：丢弃层级不连续的标题")]
    strict: bool,

    #[arg(long, default_value = "30", help = "远程下载的单次请求超时（秒）")]
    timeout: u64,

    #[arg(long, default_value = "2", help = "远程下载失败后的重试次数")]
    retries: u32,

    /// 详细输出模式
    #[arg(short, long, help = "显示调试信息")]
    verbose: bool,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("无效的元数据 '{}'，应为 KEY=VALUE", s))?;
    let key = key.trim().trim_start_matches("dc:");
    if key.is_empty() {
        return Err(format!("无效的元数据 '{}'，缺少键名", s));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Args {
    /// 合并配置文件与命令行参数
    fn into_request(self) -> Result<ConversionRequest> {
        let mut request = match &self.config {
            Some(path) => ConversionRequest::from_file(path)?,
            None => ConversionRequest::default(),
        };

        if let Some(basedir) = self.basedir {
            request.basedir = basedir;
        }
        if let Some(output) = self.output {
            request.output_file = Some(output);
        }
        if let Some(format) = self.format {
            request.format = format;
        }
        if let Some(title) = self.title {
            request.title = title;
        }
        if let Some(identifier) = self.identifier {
            request.identifier = identifier;
        }
        if let Some(charset) = self.charset {
            request.charset = charset;
        }
        if let Some(language) = self.language {
            request.language = language;
        }
        if let Some(modified) = self.modified {
            request.modified = modified;
        }
        if let Some(depth) = self.depth {
            request.depth = depth;
        }
        if let Some(headings) = self.headings {
            request.headings = headings;
        }
        request.keep_all_headings |= self.keep_all_headings;
        request.strict |= self.strict;
        request.dc.extend(self.dc);
        if !self.sources.is_empty() {
            request.spine = self.sources;
        }

        Ok(request)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let policy = FetchPolicy {
        timeout: Duration::from_secs(args.timeout),
        retries: args.retries,
    };
    let converter = Converter::new(args.into_request()?)?.with_policy(policy);

    let cancellation = CancellationToken::new();
    let token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在取消");
            token.cancel();
        }
    });

    let report = converter.run(cancellation).await?;
    if !report.diagnostics.is_empty() {
        info!("共 {} 条警告", report.diagnostics.len());
    }

    match report.output {
        ConversionOutput::Text(text) => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
        ConversionOutput::Package {
            path,
            documents,
            resources,
        } => {
            println!("🎉 {} - {} 个文档, {} 个资源", path.display(), documents, resources);
        }
    }
    Ok(())
}
