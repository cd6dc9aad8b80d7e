use anyhow::Result;
use event_stack_filter::{EventStackFilter, FilterConfig, FilterQueryMode, FilterResult};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "field_scopes.json";

/// 创建过滤器实例，优先使用JSON配置，失败时使用内置字段表
fn create_filter_with_config() -> Result<EventStackFilter> {
    match FilterConfig::from_json_file(CONFIG_FILE) {
        Ok(config) => {
            println!(
                "✅ 从 {2} 加载了 {0} 个租户字段和 {1} 个栈字段",
                config.tenant_fields.len(),
                config.stack_fields.len(),
                CONFIG_FILE
            );
            Ok(EventStackFilter::from_config(&config)?)
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用内置字段表", e);
            Ok(EventStackFilter::default())
        }
    }
}

fn print_result(label: &str, result: &FilterResult) {
    match result.executable_query() {
        Some(query) => println!("  {:<9} {}", label, query),
        None => println!("  {:<9} <不可取反>", label),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("--- Event Stack Filter: 事件过滤条件到栈查询的改写 ---");
    let filter = create_filter_with_config()?;
    println!("输入过滤条件，Ctrl-D 退出\n");

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("filter> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        editor.add_history_entry(input)?;

        let stacks = filter.run(input, FilterQueryMode::Stacks);
        let inverted = filter.run(input, FilterQueryMode::InvertedStacks);
        match (stacks, inverted) {
            (Ok(stacks), Ok(inverted)) => {
                print_result("stacks", &stacks);
                print_result("inverted", &inverted);
            }
            (Err(e), _) | (_, Err(e)) => println!("  ❌ {}", e),
        }
    }

    Ok(())
}
