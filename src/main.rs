use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wiql_compiler::config::ConfigError;
use wiql_compiler::{CompileError, CompilerConfig, QueryCompiler};

const CONFIG_FILE: &str = "compiler.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Xml,
}

/// 创建编译器实例，优先使用JSON配置，失败时使用默认配置
fn create_compiler_with_config() -> QueryCompiler {
    let compiler = match CompilerConfig::from_json_file(CONFIG_FILE) {
        Ok(config) => {
            info!(file = CONFIG_FILE, "loaded compiler config");
            QueryCompiler::from_config(config)
        }
        Err(ConfigError::Missing(_)) => QueryCompiler::new(),
        Err(e) => {
            warn!(error = %e, "无法加载配置文件, 使用默认配置");
            QueryCompiler::new()
        }
    };
    info!(limits = ?compiler.config().limits, "active compiler limits");
    compiler
}

/// 在查询下方用 ^ 标出出错位置
fn print_caret(query: &str, offset: usize) {
    println!("  {}", query);
    println!("  {}^ 位置 {}", " ".repeat(query[..offset.min(query.len())].chars().count()), offset);
}

fn run(compiler: &QueryCompiler, query: &str, format: Format) -> Result<()> {
    match compiler.compile(query) {
        Ok(document) => {
            let rendered = match format {
                Format::Json => document.to_json_pretty()?,
                Format::Xml => document.to_xml(),
            };
            println!("{}", rendered);
        }
        Err(CompileError::Syntax { offset, message }) => {
            println!("✗ 语法错误: {}", message);
            print_caret(query, offset);
        }
        Err(CompileError::UnbalancedGroup { offset, fault }) => {
            println!("✗ 括号不匹配: {}", fault);
            print_caret(query, offset);
        }
        Err(e) if e.is_defect() => println!("✗ 编译器内部错误: {}", e),
        Err(e) => println!("✗ 编译失败: {}", e),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let compiler = create_compiler_with_config();
    let mut format = Format::Json;

    println!("--- WIQL 谓词编译器 ---");
    println!("输入查询语句；:json / :xml 切换输出格式，:config 查看当前配置，:quit 退出");

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("wiql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                match line {
                    ":quit" | ":q" => break,
                    ":json" => format = Format::Json,
                    ":xml" => format = Format::Xml,
                    ":config" => println!("{}", serde_json::to_string_pretty(compiler.config())?),
                    query => run(&compiler, query, format)?,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
