//! One complete check run: resolve, query the master, fan out, evaluate.

use std::sync::Arc;

use checksoa_core::consistency::evaluate;
use checksoa_core::{CheckError, MasterResult, QueryTarget, SerialResult, ServerAddresses, Status};
use tracing::{info, warn};

use crate::aggregator::{ResultAggregator, ResultSink};
use crate::config::{CheckConfig, MasterSpec};
use crate::fetcher::SerialFetcher;
use crate::resolver::ServerResolver;
use crate::transport::{Exchange, QueryTransport};

/// Everything a finished run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Zone that was checked
    pub zone: String,
    /// Master result, when a master was configured
    pub master: Option<MasterResult>,
    /// One entry per query target, ordered when sorting was requested
    pub responses: Vec<SerialResult>,
    /// Overall outcome
    pub status: Status,
}

impl Report {
    /// Number of serials obtained, the master's included
    #[must_use]
    pub fn serial_count(&self) -> usize {
        usize::from(self.master.is_some()) + self.responses.iter().filter(|r| r.is_ok()).count()
    }

    /// Message describing a non-OK status
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        if self.status.is_ok() {
            None
        } else if self.serial_count() == 0 {
            Some(CheckError::NoSerials.to_string())
        } else {
            Some(self.status.description().to_string())
        }
    }
}

/// Runs SOA consistency checks over a DNS exchange
#[derive(Clone)]
pub struct SoaChecker {
    exchange: Arc<dyn Exchange>,
}

impl SoaChecker {
    /// Create a checker sending every query through `exchange`
    #[must_use]
    pub fn new(exchange: Arc<dyn Exchange>) -> Self {
        Self { exchange }
    }

    /// Create a checker using the network transport configured by `config`
    #[must_use]
    pub fn from_config(config: &CheckConfig) -> Self {
        Self::new(Arc::new(QueryTransport::new(&config.query)))
    }

    /// Run a check.
    ///
    /// The server set is resolved first, then the master (if any) is
    /// queried; failing either ends the run before any server is asked for
    /// its serial. Without `config.sort`, `sink` sees the master and then
    /// every result as it arrives.
    pub async fn run(&self, config: &CheckConfig, sink: &mut dyn ResultSink) -> Result<Report, CheckError> {
        config.validate()?;

        let resolver = ServerResolver::new(
            Arc::clone(&self.exchange),
            config.resolvers.clone(),
            config.query,
        );
        let fetcher = SerialFetcher::new(
            Arc::clone(&self.exchange),
            &config.zone,
            config.query,
            config.parallel,
        )?;

        let servers = resolver
            .resolve(
                &config.zone,
                &config.additional,
                config.skip_advertised,
                config.family,
            )
            .await
            .map_err(CheckError::Zone)?;
        let targets: Vec<QueryTarget> = servers
            .into_iter()
            .flat_map(ServerAddresses::into_targets)
            .collect();

        let master = match &config.master {
            Some(spec) => {
                let master = self.query_master(spec, config, &resolver, &fetcher).await?;
                info!(name = %master.name, address = %master.address, serial = master.serial, "master serial");
                if !config.sort {
                    sink.on_master(&master);
                }
                Some(master)
            }
            None => None,
        };

        info!(zone = %config.zone, targets = targets.len(), parallel = fetcher.parallel(), "querying nameservers");

        let fetcher = fetcher.with_master_serial(master.as_ref().map(|m| m.serial));
        let (mut rx, dispatcher) = fetcher.dispatch(targets);

        let mut aggregator = ResultAggregator::new();
        let relay = if config.sort { None } else { Some(sink) };
        aggregator.drain(&mut rx, relay).await;

        match dispatcher.await {
            Ok(dispatched) => {
                aggregator.verify_count(dispatched);
            }
            Err(err) => warn!(error = %err, "dispatcher task failed"),
        }

        let responses = aggregator.into_results(config.sort);
        let status = evaluate(master.as_ref(), &responses, &config.drift);
        info!(%status, responses = responses.len(), "check complete");

        Ok(Report {
            zone: config.zone.clone(),
            master,
            responses,
            status,
        })
    }

    async fn query_master(
        &self,
        spec: &MasterSpec,
        config: &CheckConfig,
        resolver: &ServerResolver,
        fetcher: &SerialFetcher,
    ) -> Result<MasterResult, CheckError> {
        let (name, address) = match spec {
            MasterSpec::Address(ip) => (ip.to_string(), *ip),
            MasterSpec::Name(name) => {
                let ip = resolver
                    .master_address(name, config.family)
                    .await
                    .ok_or_else(|| CheckError::MasterUnresolved(name.clone()))?;
                (name.clone(), ip)
            }
        };
        fetcher.fetch_master(name, address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::NullSink;
    use crate::config::AddressFamily;
    use crate::testing::{MockExchange, SoaBehavior};
    use checksoa_core::{DriftPolicy, FailureKind, TransportError};
    use hickory_proto::op::ResponseCode;
    use hickory_proto::rr::RecordType;

    fn zone_with_three_servers() -> MockExchange {
        MockExchange::new()
            .ns(
                "example.com.",
                &["ns3.example.com.", "ns1.example.com.", "ns2.example.com."],
            )
            .a("ns1.example.com.", &["192.0.2.1"])
            .a("ns2.example.com.", &["192.0.2.2"])
            .a("ns3.example.com.", &["192.0.2.3"])
            .a("master.example.com.", &["192.0.2.53"])
    }

    fn config() -> CheckConfig {
        CheckConfig::new("example.com", vec!["198.51.100.53".parse().unwrap()])
    }

    async fn run(mock: MockExchange, config: &CheckConfig) -> Result<Report, CheckError> {
        SoaChecker::new(Arc::new(mock)).run(config, &mut NullSink).await
    }

    #[tokio::test]
    async fn consistent_zone_is_ok() {
        let mock = zone_with_three_servers().default_soa(SoaBehavior::Serial(2_024_010_100));
        let report = run(mock, &config()).await.unwrap();

        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.responses.len(), 3);
        assert!(report.responses.iter().all(|r| r.delta.is_none()));
        assert!(report.responses.iter().all(|r| r.serial() == Some(2_024_010_100)));
        assert_eq!(report.error_message(), None);
    }

    #[tokio::test]
    async fn timing_out_server_is_server_error() {
        let mock = zone_with_three_servers()
            .default_soa(SoaBehavior::Serial(2_024_010_100))
            .soa("192.0.2.2", SoaBehavior::Timeout);
        let report = run(mock, &config()).await.unwrap();

        assert_eq!(report.status, Status::ServerError);
        let failed: Vec<&SerialResult> = report.responses.iter().filter(|r| !r.is_ok()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].server_name, "ns2.example.com.");
        assert_eq!(failed[0].error().unwrap().kind(), FailureKind::Transport);
        assert_eq!(
            failed[0].error(),
            Some(&checksoa_core::QueryError::Transport(TransportError::Timeout))
        );
        assert_eq!(report.error_message().as_deref(), Some("server issues"));
    }

    #[tokio::test]
    async fn master_ahead_beyond_drift() {
        let mock = zone_with_three_servers()
            .default_soa(SoaBehavior::Serial(2_024_010_100))
            .soa("192.0.2.53", SoaBehavior::Serial(2_024_010_200));
        let mut config = config();
        config.master = Some(MasterSpec::parse("master.example.com"));
        config.drift = DriftPolicy::new(0);

        let report = run(mock, &config).await.unwrap();
        assert_eq!(report.status, Status::Drift);
        assert_eq!(report.master.as_ref().unwrap().serial, 2_024_010_200);
        assert_eq!(report.responses.len(), 3);
        assert!(report.responses.iter().all(|r| r.delta == Some(100)));
    }

    #[tokio::test]
    async fn drift_within_allowance_is_ok() {
        let mock = zone_with_three_servers()
            .default_soa(SoaBehavior::Serial(2_024_010_100))
            .soa("192.0.2.53", SoaBehavior::Serial(2_024_010_200));
        let mut config = config();
        config.master = Some(MasterSpec::parse("192.0.2.53"));
        config.drift = DriftPolicy::new(100);

        let report = run(mock, &config).await.unwrap();
        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.master.unwrap().name, "192.0.2.53");
    }

    #[tokio::test]
    async fn unresolvable_master_is_fatal() {
        let mut config = config();
        config.master = Some(MasterSpec::parse("gone.example.com"));
        let err = run(zone_with_three_servers(), &config).await.unwrap_err();

        assert_eq!(err.status(), Status::MasterError);
        assert_eq!(err.to_string(), "couldn't resolve master name: gone.example.com.");
    }

    #[tokio::test]
    async fn failing_master_stops_before_fan_out() {
        let mock = Arc::new(
            zone_with_three_servers()
                .default_soa(SoaBehavior::Serial(1))
                .soa("192.0.2.53", SoaBehavior::Timeout),
        );
        let mut config = config();
        config.master = Some(MasterSpec::parse("192.0.2.53"));

        let exchange: Arc<dyn Exchange> = mock.clone();
        let err = SoaChecker::new(exchange)
            .run(&config, &mut NullSink)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::MasterError);
        assert_eq!(mock.soa_calls(), 1);
    }

    #[tokio::test]
    async fn missing_zone_is_fatal() {
        let mock = MockExchange::new().rcode("example.com.", RecordType::NS, ResponseCode::NXDomain);
        let err = run(mock, &config()).await.unwrap_err();
        assert_eq!(err.status(), Status::Drift);
        assert!(matches!(err, CheckError::Zone(_)));
    }

    #[tokio::test]
    async fn zone_failure_wins_over_master_failure() {
        let mock = Arc::new(
            MockExchange::new()
                .rcode("example.com.", RecordType::NS, ResponseCode::ServFail)
                .soa("192.0.2.53", SoaBehavior::Refused),
        );
        let mut config = config();
        config.master = Some(MasterSpec::parse("192.0.2.53"));

        let exchange: Arc<dyn Exchange> = mock.clone();
        let err = SoaChecker::new(exchange)
            .run(&config, &mut NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Zone(_)), "{err}");
        assert_eq!(err.status(), Status::Drift);
        assert_eq!(mock.soa_calls(), 0);
    }

    #[tokio::test]
    async fn no_serials_at_all() {
        let mock = zone_with_three_servers().default_soa(SoaBehavior::Timeout);
        let report = run(mock, &config()).await.unwrap();
        assert_eq!(report.status, Status::ServerError);
        assert_eq!(report.serial_count(), 0);
        assert_eq!(report.error_message().as_deref(), Some("no SOA serials obtained"));
    }

    #[tokio::test]
    async fn unresolvable_server_is_reported() {
        let mock = zone_with_three_servers()
            .ns("example.com.", &["ns1.example.com.", "lame.example.com."])
            .default_soa(SoaBehavior::Serial(3));
        let mut config = config();
        config.sort = true;
        let report = run(mock, &config).await.unwrap();

        assert_eq!(report.responses.len(), 2);
        assert_eq!(report.responses[0].server_name, "lame.example.com.");
        assert_eq!(
            report.responses[0].error().unwrap().kind(),
            FailureKind::AddressResolution
        );
        assert_eq!(report.status, Status::ServerError);
    }

    #[tokio::test]
    async fn only_additional_servers() {
        let mock = MockExchange::new().default_soa(SoaBehavior::Serial(9));
        let mut config = config().additional_list("192.0.2.10,192.0.2.11");
        config.skip_advertised = true;
        config.family = AddressFamily::V4Only;

        let report = run(mock, &config).await.unwrap();
        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.responses.len(), 2);
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ResultSink for Recorder {
        fn on_master(&mut self, master: &MasterResult) {
            self.events.push(format!("master {}", master.serial));
        }

        fn on_result(&mut self, result: &SerialResult) {
            self.events.push(result.server_name.clone());
        }
    }

    #[tokio::test]
    async fn immediate_mode_relays_master_first() {
        let mock = zone_with_three_servers()
            .default_soa(SoaBehavior::Serial(5))
            .soa("192.0.2.53", SoaBehavior::Serial(5));
        let mut config = config();
        config.master = Some(MasterSpec::parse("192.0.2.53"));

        let mut recorder = Recorder::default();
        let report = SoaChecker::new(Arc::new(mock))
            .run(&config, &mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.events.len(), 4);
        assert_eq!(recorder.events[0], "master 5");
        assert_eq!(report.status, Status::Ok);
    }

    #[tokio::test]
    async fn sorted_mode_relays_nothing() {
        let mock = zone_with_three_servers().default_soa(SoaBehavior::Serial(5));
        let mut config = config();
        config.sort = true;

        let mut recorder = Recorder::default();
        let report = SoaChecker::new(Arc::new(mock))
            .run(&config, &mut recorder)
            .await
            .unwrap();

        assert!(recorder.events.is_empty());
        let names: Vec<&str> = report.responses.iter().map(|r| r.server_name.as_str()).collect();
        assert_eq!(names, ["ns1.example.com.", "ns2.example.com.", "ns3.example.com."]);
    }
}
