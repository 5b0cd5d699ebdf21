//! Process check and event log builders through the public API.

use check_filter::consumers::event_log::{KEYWORD_AUDIT_FAILURE, KEYWORD_AUDIT_SUCCESS};
use check_filter::consumers::{
    aggregate_registry, event_log_registry, process_registry, EventRecord, EventSelection,
    EventSelectionConfig, ProcessCounts, ProcessRecord, ProcessSelection, ProcessState,
    SelectionConfig, Status,
};
use check_filter::{parse, BindError, FilterCompiler, FilterConfig, FilterError};

fn snapshot() -> Vec<ProcessRecord> {
    let mut processes = vec![
        ProcessRecord::new(1, "init"),
        ProcessRecord::new(412, "sshd"),
        ProcessRecord::new(413, "sshd").with_state(ProcessState::Hung),
        ProcessRecord::new(900, "httpd").with_state(ProcessState::Unreadable),
        ProcessRecord::new(901, "httpd"),
        ProcessRecord::new(902, "httpd"),
    ];
    processes[4].working_set = 900 * 1024 * 1024;
    processes[5].working_set = 20 * 1024 * 1024;
    processes[5].kernel_percent = 70.0;
    processes
}

fn config(yaml: &str) -> SelectionConfig {
    SelectionConfig::from_yaml_str(yaml).unwrap()
}

#[test]
fn test_web_server_check() {
    let selection = ProcessSelection::new(&config(
        r#"
filter: "exe == 'httpd'"
warning: "working_set > 512m"
critical: "time_percent >= 50% || count < 2"
"#,
    ))
    .unwrap();
    let processes = snapshot();
    let report = selection.evaluate(&processes);

    assert_eq!(report.counts.count, 3);
    assert_eq!(report.ok.len(), 1);
    assert_eq!(report.warning[0].pid, 901);
    assert_eq!(report.critical[0].pid, 902);
    assert_eq!(report.status, Status::Critical);
}

#[test]
fn test_count_threshold_alone_decides_status() {
    let selection = ProcessSelection::new(&config(
        r#"
filter: "exe == 'sshd'"
warning: ""
critical: "state == 'unreadable' || count < 3"
"#,
    ))
    .unwrap();
    let processes = snapshot();
    let report = selection.evaluate(&processes);

    assert!(report.critical.is_empty());
    assert_eq!(report.counts.count, 2);
    assert_eq!(report.status, Status::Critical);
}

#[test]
fn test_exclude_removes_processes() {
    let selection = ProcessSelection::new(&config(
        r#"
filter: ""
exclude: "pid in (1, 900) || exe == 'sshd'"
warning: ""
critical: ""
"#,
    ))
    .unwrap();
    let processes = snapshot();
    let report = selection.evaluate(&processes);

    let pids: Vec<u32> = report.ok.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![901, 902]);
    assert_eq!(report.status, Status::Ok);
    assert!(!selection.is_selected(&processes[0]));
}

#[test]
fn test_rules_escalate_on_counts() {
    let selection = ProcessSelection::new(&config(
        r#"
filter: ""
warning_rules: "warn_count >= 1"
critical_rules: "warn_count > 1"
"#,
    ))
    .unwrap();
    let processes = snapshot();
    let report = selection.evaluate(&processes);

    // sshd 413 (hung) and httpd 900 (unreadable) are both warnings
    assert_eq!(report.counts.warn_count, 2);
    assert_eq!(report.status, Status::Critical);

    let counts = ProcessCounts {
        count: 4,
        ok_count: 3,
        warn_count: 1,
        crit_count: 0,
    };
    assert_eq!(selection.status_of(&counts), Status::Warning);
}

#[test]
fn test_status_ordering() {
    assert!(Status::Ok < Status::Warning);
    assert!(Status::Warning < Status::Critical);
    assert_eq!(
        [Status::Warning, Status::Critical, Status::Ok].iter().max(),
        Some(&Status::Critical)
    );
}

#[test]
fn test_selection_uses_compiler_limits() {
    let compiler = FilterCompiler::with_config(FilterConfig::new().with_max_depth(1));
    let nested = SelectionConfig {
        filter: "((exe == 'sshd'))".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        ProcessSelection::with_compiler(&nested, &compiler),
        Err(FilterError::Parse(_))
    ));
    assert!(ProcessSelection::new(&nested).is_ok());
}

#[test]
fn test_selection_config_rejects_unknown_keys() {
    let result = SelectionConfig::from_yaml_str("critcal: count == 0");
    assert!(matches!(result, Err(FilterError::Config(_))));
}

#[test]
fn test_one_expression_two_record_types() {
    let tree = parse("exe == 'sshd' && crit_count == 0").unwrap();
    let per_process = tree.bind(&process_registry()).unwrap();
    let aggregate = tree.bind(&aggregate_registry()).unwrap();

    assert!(per_process.check(&ProcessRecord::new(7, "sshd")));
    assert!(!per_process.check(&ProcessRecord::new(7, "cron")));
    assert!(aggregate.check(&ProcessCounts::default()));
    assert_eq!(per_process.to_string(), "( exe == 'sshd' && ~crit_count == 0 )");
}

fn event(level: u8, keywords: u64) -> EventRecord {
    EventRecord {
        event_id: 4625,
        level,
        provider: "Microsoft-Windows-Security-Auditing".to_string(),
        computer: "dc01".to_string(),
        channel: "Security".to_string(),
        keywords,
        written: 30.0,
    }
}

#[test]
fn test_event_levels_by_name_and_number() {
    let registry = event_log_registry();
    let by_name = parse("level in ('error', critical)").unwrap().bind(&registry).unwrap();
    let by_number = parse("level <= 2").unwrap().bind(&registry).unwrap();

    for level in 1..=5 {
        let record = event(level, 0);
        assert_eq!(by_name.check(&record), level <= 2, "level {level}");
        assert_eq!(by_name.check(&record), by_number.check(&record));
    }

    let warning = parse("level = 'warn'").unwrap().bind(&registry).unwrap();
    assert!(warning.check(&event(3, 0)));
    assert!(!warning.check(&event(4, 0)));
}

#[test]
fn test_event_unknown_level() {
    let result = parse("level == 'loud'").unwrap().bind(&event_log_registry());
    assert!(matches!(result, Err(BindError::InvalidValue { .. })));
}

#[test]
fn test_event_audit_keywords() {
    let registry = event_log_registry();
    let failures = parse("channel == 'Security' && keywords == 'auditfailure'")
        .unwrap()
        .bind(&registry)
        .unwrap();
    let any_audit = parse("keywords in (auditfailure, auditsuccess)")
        .unwrap()
        .bind(&registry)
        .unwrap();

    assert!(failures.check(&event(0, KEYWORD_AUDIT_FAILURE)));
    assert!(!failures.check(&event(0, KEYWORD_AUDIT_SUCCESS)));
    assert!(any_audit.check(&event(0, KEYWORD_AUDIT_SUCCESS | 0x1)));
    assert!(!any_audit.check(&event(0, 0x1)));
}

#[test]
fn test_event_keywords_rejections() {
    let registry = event_log_registry();
    assert!(matches!(
        parse("keywords in (auditfailure, classic)").unwrap().bind(&registry),
        Err(BindError::InvalidValue { .. })
    ));
    assert!(matches!(
        parse("keywords > 4").unwrap().bind(&registry),
        Err(BindError::Unsupported { .. })
    ));
}

#[test]
fn test_recent_events_filter() {
    let filter = parse("written < 1m && event_id in (4625, 4740)")
        .unwrap()
        .bind(&event_log_registry())
        .unwrap();

    let mut record = event(0, KEYWORD_AUDIT_FAILURE);
    assert!(filter.check(&record));
    record.written = 3600.0;
    assert!(!filter.check(&record));
}

#[test]
fn test_event_log_check() {
    let config = EventSelectionConfig::from_yaml_str(
        r#"
filter: "channel == 'Security' and level <= 3"
warning: "keywords == 'auditfailure'"
critical: "keywords == 'auditfailure' and written > -2s"
"#,
    )
    .unwrap();
    let selection = EventSelection::new(&config).unwrap();

    let mut recent = event(2, KEYWORD_AUDIT_FAILURE);
    recent.written = 1.0;
    let mut verbose = event(5, KEYWORD_AUDIT_FAILURE);
    verbose.written = 1.0;
    let events = vec![
        recent,
        event(3, KEYWORD_AUDIT_FAILURE),
        event(2, KEYWORD_AUDIT_SUCCESS),
        verbose,
    ];
    let report = selection.evaluate(&events);

    assert_eq!(report.counts.count, 3);
    assert_eq!(report.counts.ok_count, 1);
    assert_eq!(report.counts.warn_count, 1);
    assert_eq!(report.counts.crit_count, 1);
    assert_eq!(report.critical[0].written, 1.0);
    assert_eq!(report.status, Status::Critical);

    // the recent failure turns into a warning once it is older than 2s
    assert_eq!(selection.recheck_after(3600.0), Some(2.0));
    let mut aged = events[0].clone();
    aged.written = 3.0;
    assert_eq!(selection.event_status(&aged), Status::Warning);
}
