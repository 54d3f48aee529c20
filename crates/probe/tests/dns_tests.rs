//! Tests for the DNS record policy using an in-memory resolver

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use probe::dns::{check_dns, resolve_records};
use probe::{DnsRequest, ProbeError, ProbeOutcome, RecordKind, Resolve, Response};

#[derive(Default)]
struct FakeResolver {
    answers: HashMap<RecordKind, Result<Vec<String>, ProbeError>>,
    delay: Option<Duration>,
}

impl FakeResolver {
    fn healthy() -> Self {
        let mut answers = HashMap::new();
        answers.insert(RecordKind::A, Ok(vec!["93.184.216.34".to_string()]));
        answers.insert(RecordKind::Aaaa, Ok(vec!["2606:2800:220:1::".to_string()]));
        answers.insert(RecordKind::Cname, Ok(Vec::new()));
        answers.insert(RecordKind::Ns, Ok(vec!["a.iana-servers.net.".to_string()]));
        answers.insert(RecordKind::Mx, Ok(vec!["10 mail.example.com.".to_string()]));
        answers.insert(RecordKind::Txt, Ok(vec!["v=spf1 -all".to_string()]));
        Self { answers, delay: None }
    }

    fn answer(mut self, kind: RecordKind, answer: Result<Vec<String>, ProbeError>) -> Self {
        self.answers.insert(kind, answer);
        self
    }
}

#[async_trait]
impl Resolve for FakeResolver {
    async fn lookup(&self, _domain: &str, kind: RecordKind) -> Result<Vec<String>, ProbeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answers.get(&kind).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[tokio::test]
async fn test_all_records_resolved() {
    let records = resolve_records(&FakeResolver::healthy(), "example.com").await.unwrap();

    assert_eq!(records.a, vec!["93.184.216.34"]);
    assert_eq!(records.ns, vec!["a.iana-servers.net."]);
    assert_eq!(records.mx, vec!["10 mail.example.com."]);
    assert_eq!(records.txt, vec!["v=spf1 -all"]);
    assert!(records.cname.is_empty());
}

#[tokio::test]
async fn test_domain_without_mx_yields_empty_list() {
    let resolver = FakeResolver::healthy().answer(RecordKind::Mx, Ok(Vec::new()));
    let records = resolve_records(&resolver, "example.com").await.unwrap();
    assert!(records.mx.is_empty());
}

#[tokio::test]
async fn test_mx_and_txt_failures_are_swallowed() {
    let resolver = FakeResolver::healthy()
        .answer(RecordKind::Mx, Err(ProbeError::Resolution("SERVFAIL".to_string())))
        .answer(RecordKind::Txt, Err(ProbeError::Timeout));

    let records = resolve_records(&resolver, "example.com").await.unwrap();
    assert!(records.mx.is_empty());
    assert!(records.txt.is_empty());
    assert_eq!(records.a, vec!["93.184.216.34"]);
}

#[tokio::test]
async fn test_ns_failure_aborts_the_check() {
    let resolver = FakeResolver::healthy()
        .answer(RecordKind::Ns, Err(ProbeError::Resolution("NS example.com: SERVFAIL".to_string())));

    let error = resolve_records(&resolver, "example.com").await.unwrap_err();
    assert!(matches!(error, ProbeError::Resolution(_)));

    let result = check_dns(&resolver, &DnsRequest::new("example.com", Duration::from_secs(5))).await;
    assert!(matches!(result.outcome, ProbeOutcome::TransportError(ProbeError::Resolution(_))));
}

#[tokio::test]
async fn test_required_record_timeout_is_timeout_outcome() {
    let resolver = FakeResolver::healthy().answer(RecordKind::Aaaa, Err(ProbeError::Timeout));
    let result = check_dns(&resolver, &DnsRequest::new("example.com", Duration::from_secs(5))).await;
    assert_eq!(result.outcome, ProbeOutcome::Timeout);
}

#[tokio::test]
async fn test_slow_resolver_hits_the_deadline() {
    let mut resolver = FakeResolver::healthy();
    resolver.delay = Some(Duration::from_secs(2));

    let result =
        check_dns(&resolver, &DnsRequest::new("example.com", Duration::from_millis(100))).await;
    assert_eq!(result.outcome, ProbeOutcome::Timeout);
}

#[tokio::test]
async fn test_successful_check_carries_records() {
    let result =
        check_dns(&FakeResolver::healthy(), &DnsRequest::new("example.com", Duration::from_secs(5)))
            .await;

    match result.outcome {
        ProbeOutcome::Success(Response::Dns(records)) => assert_eq!(records.aaaa.len(), 1),
        other => panic!("unexpected outcome {other:?}"),
    }
}
