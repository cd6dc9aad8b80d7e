use event_stack_filter::{parse, EventStackFilter, FilterQueryMode, Node};
use std::collections::HashSet;

const STACK_ID: &str = "1ecd0826e447ad1e78877555";
const TOTAL_STACKS: usize = 13000;

struct Stack {
    id: String,
    status: &'static str,
}

struct Event {
    kind: &'static str,
    session: Option<&'static str>,
}

fn status_for(index: usize) -> &'static str {
    match index {
        i if i < 3000 => "fixed",
        i if i < 4000 => "ignored",
        i if i < 10000 => "discarded",
        i if i < 12000 => "regressed",
        _ => "open",
    }
}

fn create_stacks(count: usize) -> Vec<Stack> {
    (0..count)
        .map(|index| Stack {
            id: if index == 0 {
                STACK_ID.to_string()
            } else {
                format!("{:024x}", index)
            },
            status: status_for(index),
        })
        .collect()
}

fn events_for(index: usize) -> Vec<Event> {
    let mut events = vec![Event {
        kind: if index % 3 == 0 { "error" } else { "log" },
        session: if index % 100 == 0 { Some("sessionId") } else { None },
    }];
    if index % 7 == 0 {
        events.push(Event {
            kind: "heartbeat",
            session: None,
        });
    }
    events
}

/// 按文档存储的方式对过滤树求值，字段值由 `lookup` 提供
fn eval(node: &Node, lookup: &dyn Fn(&str) -> Option<String>) -> bool {
    let field_equals = |field: Option<&str>, value: &str| {
        field
            .and_then(|f| lookup(f))
            .is_some_and(|actual| actual.eq_ignore_ascii_case(value))
    };
    match node {
        Node::Term(term) => field_equals(term.field.as_deref(), &term.value),
        Node::Phrase(phrase) => field_equals(phrase.field.as_deref(), &phrase.phrase),
        Node::Range(_) => false,
        Node::Not(child) => !eval(child, lookup),
        Node::And(children) => children.iter().all(|c| eval(c, lookup)),
        Node::Or(children) => children.iter().any(|c| eval(c, lookup)),
        Node::Group(child) => eval(child, lookup),
        Node::MatchAll => true,
        Node::MatchNone => false,
    }
}

/// 在栈文档上执行渲染后的栈查询
fn query_stack_ids(stacks: &[Stack], query: &str) -> HashSet<String> {
    let tree = parse(query).expect("rendered query parses");
    stacks
        .iter()
        .filter(|stack| {
            eval(&tree, &|field| match field {
                "id" => Some(stack.id.clone()),
                "status" => Some(stack.status.to_string()),
                _ => None,
            })
        })
        .map(|stack| stack.id.clone())
        .collect()
}

/// 至少有一个事件满足原始（事件级）过滤条件的栈
fn truly_matching_ids(stacks: &[Stack], filter: &str) -> HashSet<String> {
    let tree = parse(filter).unwrap();
    stacks
        .iter()
        .enumerate()
        .filter(|(index, stack)| {
            events_for(*index).iter().any(|event| {
                eval(&tree, &|field| match field {
                    "stack" => Some(stack.id.clone()),
                    "status" => Some(stack.status.to_string()),
                    "type" => Some(event.kind.to_string()),
                    "reference" | "ref.session" => event.session.map(str::to_string),
                    _ => None,
                })
            })
        })
        .map(|(_, stack)| stack.id.clone())
        .collect()
}

#[test]
fn test_verify_event_stack_filter() {
    let stacks = create_stacks(TOTAL_STACKS);
    let filter = EventStackFilter::default();
    let by_stack = format!("stack:{STACK_ID}");
    let excluding_stack = format!("-stack:{STACK_ID}");
    let stack_and_status = format!("stack:{STACK_ID} (status:open OR status:regressed)");

    // (过滤条件, 栈总数, 可取反, 取反后总数, 无租户前缀)
    let cases = [
        (
            "-type:heartbeat (reference:sessionId OR ref.session:sessionId)",
            13000,
            true,
            0,
            true,
        ),
        ("status:open OR status:regressed", 3000, true, 10000, true),
        ("NOT (status:open OR status:regressed)", 10000, true, 3000, true),
        ("status:fixed", 3000, true, 10000, true),
        ("NOT status:fixed", 10000, true, 3000, true),
        (by_stack.as_str(), 1, true, 0, false),
        (excluding_stack.as_str(), 12999, false, 0, false),
        (stack_and_status.as_str(), 0, true, 1, false),
    ];

    for (input, total, invertable, inverted_total, prefix_free) in cases {
        let stack_filter = filter.run(input, FilterQueryMode::Stacks).unwrap();
        let stack_ids = query_stack_ids(&stacks, &stack_filter.query);
        assert_eq!(stack_ids.len(), total, "{input} => {}", stack_filter.query);
        assert_eq!(stack_filter.is_invertable, invertable, "{input}");

        let inverted_filter = filter.run(input, FilterQueryMode::InvertedStacks).unwrap();
        assert_eq!(inverted_filter.is_invertable, invertable, "{input}");

        let Some(inverted_query) = inverted_filter.executable_query() else {
            assert!(!invertable, "{input}");
            continue;
        };
        let inverted_ids = query_stack_ids(&stacks, inverted_query);
        assert_eq!(inverted_ids.len(), inverted_total, "{input} => {inverted_query}");

        if prefix_free {
            assert_eq!(stack_ids.len() + inverted_ids.len(), TOTAL_STACKS, "{input}");
            assert!(stack_ids.is_disjoint(&inverted_ids), "{input}");
        }
    }
}

#[test]
fn test_tenant_field_inside_or_is_not_invertable() {
    let filter = EventStackFilter::default();
    for input in [
        "project:p1 OR type:error",
        "status:open (stack:abc OR type:error)",
        "type:error NOT organization:o1",
    ] {
        let result = filter.run(input, FilterQueryMode::InvertedStacks).unwrap();
        assert!(!result.is_invertable, "{input}");
        assert_eq!(result.executable_query(), None, "{input}");

        let stacks = filter.run(input, FilterQueryMode::Stacks).unwrap();
        assert!(!stacks.is_invertable, "{input}");
    }
}

#[test]
fn test_stack_filter_never_drops_a_matching_stack() {
    let stacks = create_stacks(1400);
    let filter = EventStackFilter::default();

    for input in [
        "-type:heartbeat (reference:sessionId OR ref.session:sessionId)",
        "status:open type:error",
        "status:fixed OR type:heartbeat",
        "(status:open OR status:regressed) reference:sessionId",
        "NOT status:fixed -type:heartbeat",
        "type:error",
        &*format!("stack:{STACK_ID} type:log"),
    ] {
        let truth = truly_matching_ids(&stacks, input);
        let query = filter.run(input, FilterQueryMode::Stacks).unwrap().query;
        let candidates = query_stack_ids(&stacks, &query);
        assert!(
            truth.is_subset(&candidates),
            "{input} => {query} dropped {} stacks",
            truth.difference(&candidates).count()
        );
    }
}

#[test]
fn test_rewrite_runs_concurrently_on_shared_filter() {
    let filter = EventStackFilter::default();
    let results: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    filter
                        .run(
                            "stack:abc type:error (status:open OR status:regressed)",
                            FilterQueryMode::Stacks,
                        )
                        .unwrap()
                        .query
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for query in results {
        assert_eq!(query, "id:abc AND (status:open OR status:regressed)");
    }
}
