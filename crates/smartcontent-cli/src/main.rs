use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as _;
use smartcontent_core::{Node, Parser, RenderOptions, SourceMap, normalize};
use tracing::Level;

/// Render plain text as link-annotated HTML.
#[derive(Debug, clap::Parser)]
#[command(name = "smartcontent", version)]
struct Cli {
    /// Input file; stdin when omitted
    input: Option<PathBuf>,

    /// Visible length budget in characters
    #[arg(short, long, env = "SMARTCONTENT_LIMIT")]
    limit: Option<usize>,

    /// Pass the markup through the allow-list sanitizer
    #[arg(long)]
    sanitized: bool,

    /// Lex the input as given, without normalizing whitespace
    #[arg(long)]
    no_normalize: bool,

    /// Print the lexed nodes with their source ranges instead of markup
    #[arg(long)]
    tokens: bool,

    /// Log parser activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let source = read_input(cli.input.as_deref())?;
    let parser = Parser::new();

    if cli.tokens {
        let text = if cli.no_normalize {
            source
        } else {
            normalize(&source)
        };
        let nodes = parser.lex(&text).context("failed to lex input")?;
        print!("{}", describe_nodes(&nodes, &SourceMap::new(&text)));
        return Ok(());
    }

    let options = RenderOptions {
        limit: cli.limit,
        sanitized: cli.sanitized,
        verbatim: cli.no_normalize,
    };
    let html = parser
        .render(&source, &options)
        .context("failed to render input")?;
    print!("{html}");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// One line per node, children indented below their group.
fn describe_nodes(nodes: &[Node], source_map: &SourceMap<'_>) -> String {
    let mut out = String::new();
    let mut stack = nodes.iter().rev().map(|node| (node, 0)).collect::<Vec<_>>();
    while let Some((node, depth)) = stack.pop() {
        let range = source_map.range(node.span());
        out.push_str(&format!(
            "{:indent$}{} {}-{} {:?}\n",
            "",
            node.rule(),
            range.start,
            range.end,
            node.content(),
            indent = depth * 2
        ));
        if let Some(children) = node.children() {
            stack.extend(children.iter().rev().map(|child| (child, depth + 1)));
        }
    }
    out
}
