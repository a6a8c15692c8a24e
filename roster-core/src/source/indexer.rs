//! GraphQL indexer client.
//!
//! Fetches competition metadata, per-team member stats and account
//! memberships from a leaderboard subgraph. Handles retries with exponential backoff, rate limiting, and the
//! circuit breaker. This is the only place fetch failures are retried; the
//! roster controller reports whatever this client finally returns.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::circuit_breaker::CircuitBreaker;
use super::{AccountTeamSource, CompetitionSource, RosterStatsSource, SourceError, TeamSource};
use crate::chain::ChainId;
use crate::domain::{AccountTeam, Address, Competition, CompetitionIndex, MemberStat, Team};

const COMPETITION_QUERY: &str = r#"
query Competition($id: ID!) {
  competition(id: $id) {
    index
    registrationActive
    start
    end
    maxTeamSize
  }
}"#;

const TEAM_MEMBERS_QUERY: &str = r#"
query TeamMembers($teamId: ID!, $first: Int!, $skip: Int!) {
  team(id: $teamId) {
    members(first: $first, skip: $skip, orderBy: pnl, orderDirection: desc) {
      address
      pnl
    }
  }
}"#;

const TEAM_QUERY: &str = r#"
query Team($teamId: ID!) {
  team(id: $teamId) {
    members(first: 1000) {
      address
    }
  }
}"#;

const ACCOUNT_TEAM_QUERY: &str = r#"
query AccountTeam($id: ID!) {
  teamMember(id: $id) {
    team {
      leader
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CompetitionData {
    competition: Option<RawCompetition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompetition {
    index: Value,
    registration_active: bool,
    start: Option<Value>,
    end: Option<Value>,
    max_team_size: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TeamData {
    team: Option<RawTeam>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    members: Vec<RawMember>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    address: String,
    pnl: Value,
}

#[derive(Debug, Deserialize)]
struct TeamRosterData {
    team: Option<RawRoster>,
}

#[derive(Debug, Deserialize)]
struct RawRoster {
    members: Vec<RawRosterMember>,
}

#[derive(Debug, Deserialize)]
struct RawRosterMember {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountTeamData {
    team_member: Option<RawTeamMember>,
}

#[derive(Debug, Deserialize)]
struct RawTeamMember {
    team: RawTeamRef,
}

#[derive(Debug, Deserialize)]
struct RawTeamRef {
    leader: String,
}

/// Subgraph `BigInt`/`BigDecimal` fields arrive as strings; plain numbers are accepted too.
fn number(value: &Value, field: &str) -> Result<f64, SourceError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| SourceError::ResponseFormatChanged(format!("{field} out of range"))),
        Value::String(s) => s.parse::<f64>().map_err(|_| {
            SourceError::ResponseFormatChanged(format!("{field} is not numeric: {s}"))
        }),
        other => Err(SourceError::ResponseFormatChanged(format!(
            "{field} has unexpected type: {other}"
        ))),
    }
}

fn timestamp(value: &Option<Value>, field: &str) -> Result<Option<DateTime<Utc>>, SourceError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let secs = number(v, field)? as i64;
            DateTime::from_timestamp(secs, 0)
                .map(Some)
                .ok_or_else(|| SourceError::ResponseFormatChanged(format!("invalid {field}: {secs}")))
        }
    }
}

fn unwrap_data<T>(resp: GraphqlResponse<T>) -> Result<T, SourceError> {
    if !resp.errors.is_empty() {
        let messages: Vec<String> = resp.errors.into_iter().map(|e| e.message).collect();
        return Err(SourceError::Query(messages.join("; ")));
    }
    resp.data
        .ok_or_else(|| SourceError::ResponseFormatChanged("response has neither data nor errors".into()))
}

fn parse_competition(
    index: CompetitionIndex,
    resp: GraphqlResponse<CompetitionData>,
) -> Result<Competition, SourceError> {
    let raw = unwrap_data(resp)?
        .competition
        .ok_or(SourceError::CompetitionNotFound(index))?;

    let parsed_index = number(&raw.index, "index")? as u64;
    if parsed_index != index.0 {
        return Err(SourceError::ResponseFormatChanged(format!(
            "asked for competition {index}, got {parsed_index}"
        )));
    }

    let max_team_size = match &raw.max_team_size {
        None | Some(Value::Null) => None,
        Some(v) => Some(number(v, "maxTeamSize")? as u32),
    };

    Ok(Competition {
        index,
        registration_active: raw.registration_active,
        start: timestamp(&raw.start, "start")?,
        end: timestamp(&raw.end, "end")?,
        max_team_size,
    })
}

fn parse_members(resp: GraphqlResponse<TeamData>) -> Result<Vec<MemberStat>, SourceError> {
    // An unknown team is an empty roster, not an error.
    let Some(team) = unwrap_data(resp)?.team else {
        return Ok(Vec::new());
    };

    team.members
        .into_iter()
        .map(|m| -> Result<MemberStat, SourceError> {
            let address: Address = m.address.parse().map_err(|e| {
                SourceError::ResponseFormatChanged(format!("bad member address: {e}"))
            })?;
            Ok(MemberStat {
                address,
                pnl: number(&m.pnl, "pnl")?,
            })
        })
        .collect()
}

fn parse_team(
    competition_index: CompetitionIndex,
    leader: &Address,
    resp: GraphqlResponse<TeamRosterData>,
) -> Result<Option<Team>, SourceError> {
    let Some(raw) = unwrap_data(resp)?.team else {
        return Ok(None);
    };
    let members = raw
        .members
        .into_iter()
        .map(|m| {
            m.address.parse::<Address>().map_err(|e| {
                SourceError::ResponseFormatChanged(format!("bad member address: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Team::new(leader.clone(), competition_index, members)))
}

fn parse_account_team(resp: GraphqlResponse<AccountTeamData>) -> Result<AccountTeam, SourceError> {
    let Some(member) = unwrap_data(resp)?.team_member else {
        return Ok(AccountTeam::none());
    };
    let leader = member.team.leader.parse::<Address>().map_err(|e| {
        SourceError::ResponseFormatChanged(format!("bad team leader address: {e}"))
    })?;
    Ok(AccountTeam::led_by(leader))
}

/// Subgraph id of a team: competition index and leader address.
pub fn team_id(competition_index: CompetitionIndex, leader: &Address) -> String {
    format!("{competition_index}-{leader}")
}

pub struct IndexerClient {
    client: reqwest::blocking::Client,
    url: String,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl IndexerClient {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("team-roster/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST a GraphQL query with retry and circuit breaker logic.
    fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<GraphqlResponse<T>, SourceError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(SourceError::CircuitBreakerTripped);
        }

        let body = json!({ "query": query, "variables": variables });
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(attempt, ?delay, "retrying indexer query");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(SourceError::CircuitBreakerTripped);
            }

            match self.client.post(&self.url).json(&body).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(SourceError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(SourceError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(SourceError::Http(status.as_u16()));
                        continue;
                    }

                    let parsed: GraphqlResponse<T> = resp.json().map_err(|e| {
                        SourceError::ResponseFormatChanged(format!("failed to parse response: {e}"))
                    })?;
                    self.circuit_breaker.record_success();
                    return Ok(parsed);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(SourceError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(SourceError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SourceError::Other("max retries exceeded".into())))
    }
}

impl CompetitionSource for IndexerClient {
    fn name(&self) -> &str {
        "graph_indexer"
    }

    fn competition(
        &self,
        chain: ChainId,
        index: CompetitionIndex,
    ) -> Result<Competition, SourceError> {
        tracing::debug!(%chain, %index, "querying competition");
        let resp = self.query(COMPETITION_QUERY, json!({ "id": index.to_string() }))?;
        parse_competition(index, resp)
    }
}

impl RosterStatsSource for IndexerClient {
    fn name(&self) -> &str {
        "graph_indexer"
    }

    fn team_members_stats(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        leader: &Address,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<MemberStat>, SourceError> {
        let skip = page.saturating_sub(1) * per_page;
        tracing::debug!(%chain, %competition_index, %leader, page, per_page, "querying team members");
        let resp = self.query(
            TEAM_MEMBERS_QUERY,
            json!({
                "teamId": team_id(competition_index, leader),
                "first": per_page,
                "skip": skip,
            }),
        )?;
        parse_members(resp)
    }
}

impl TeamSource for IndexerClient {
    fn name(&self) -> &str {
        "graph_indexer"
    }

    fn team(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        leader: &Address,
    ) -> Result<Option<Team>, SourceError> {
        tracing::debug!(%chain, %competition_index, %leader, "querying team");
        let resp = self.query(
            TEAM_QUERY,
            json!({ "teamId": team_id(competition_index, leader) }),
        )?;
        parse_team(competition_index, leader, resp)
    }
}

impl AccountTeamSource for IndexerClient {
    fn name(&self) -> &str {
        "graph_indexer"
    }

    fn team_of(
        &self,
        chain: ChainId,
        competition_index: CompetitionIndex,
        account: &Address,
    ) -> Result<AccountTeam, SourceError> {
        tracing::debug!(%chain, %competition_index, %account, "querying account team");
        // Team members are keyed the same way as teams: competition, then address.
        let resp = self.query(
            ACCOUNT_TEAM_QUERY,
            json!({ "id": team_id(competition_index, account) }),
        )?;
        parse_account_team(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader() -> Address {
        "0x1111111111111111111111111111111111111111".parse().unwrap()
    }

    #[test]
    fn parses_competition_with_string_numbers() {
        let resp: GraphqlResponse<CompetitionData> = serde_json::from_str(
            r#"{"data":{"competition":{"index":"0","registrationActive":true,
                "start":"1650000000","end":1651000000,"maxTeamSize":"10"}}}"#,
        )
        .unwrap();
        let comp = parse_competition(CompetitionIndex(0), resp).unwrap();
        assert!(comp.registration_active);
        assert_eq!(comp.max_team_size, Some(10));
        assert_eq!(comp.start.unwrap().timestamp(), 1_650_000_000);
        assert_eq!(comp.end.unwrap().timestamp(), 1_651_000_000);
    }

    #[test]
    fn missing_competition_is_not_found() {
        let resp: GraphqlResponse<CompetitionData> =
            serde_json::from_str(r#"{"data":{"competition":null}}"#).unwrap();
        assert_eq!(
            parse_competition(CompetitionIndex(4), resp),
            Err(SourceError::CompetitionNotFound(CompetitionIndex(4)))
        );
    }

    #[test]
    fn graphql_errors_surface_as_query_errors() {
        let resp: GraphqlResponse<TeamData> = serde_json::from_str(
            r#"{"data":null,"errors":[{"message":"indexing_error"},{"message":"store error"}]}"#,
        )
        .unwrap();
        assert_eq!(
            parse_members(resp),
            Err(SourceError::Query("indexing_error; store error".into()))
        );
    }

    #[test]
    fn parses_member_page() {
        let resp: GraphqlResponse<TeamData> = serde_json::from_str(
            r#"{"data":{"team":{"members":[
                {"address":"0x1111111111111111111111111111111111111111","pnl":"1250.5"},
                {"address":"0x2222222222222222222222222222222222222222","pnl":-30}
            ]}}}"#,
        )
        .unwrap();
        let members = parse_members(resp).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].address, leader());
        assert_eq!(members[0].pnl, 1250.5);
        assert_eq!(members[1].pnl, -30.0);
    }

    #[test]
    fn unknown_team_is_empty() {
        let resp: GraphqlResponse<TeamData> =
            serde_json::from_str(r#"{"data":{"team":null}}"#).unwrap();
        assert!(parse_members(resp).unwrap().is_empty());
    }

    #[test]
    fn malformed_member_address_is_format_error() {
        let resp: GraphqlResponse<TeamData> = serde_json::from_str(
            r#"{"data":{"team":{"members":[{"address":"nope","pnl":"1"}]}}}"#,
        )
        .unwrap();
        assert!(matches!(
            parse_members(resp),
            Err(SourceError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn parsed_team_keeps_leader_first() {
        let resp: GraphqlResponse<TeamRosterData> = serde_json::from_str(
            r#"{"data":{"team":{"members":[
                {"address":"0x2222222222222222222222222222222222222222"}
            ]}}}"#,
        )
        .unwrap();
        let team = parse_team(CompetitionIndex(0), &leader(), resp).unwrap().unwrap();
        assert_eq!(team.members().len(), 2);
        assert_eq!(team.members()[0], leader());
    }

    #[test]
    fn account_team_names_the_leader() {
        let resp: GraphqlResponse<AccountTeamData> = serde_json::from_str(
            r#"{"data":{"teamMember":{"team":{"leader":"0x1111111111111111111111111111111111111111"}}}}"#,
        )
        .unwrap();
        assert_eq!(parse_account_team(resp), Ok(AccountTeam::led_by(leader())));
    }

    #[test]
    fn account_without_membership_has_no_team() {
        let resp: GraphqlResponse<AccountTeamData> =
            serde_json::from_str(r#"{"data":{"teamMember":null}}"#).unwrap();
        assert_eq!(parse_account_team(resp), Ok(AccountTeam::none()));
    }

    #[test]
    fn team_id_format() {
        assert_eq!(
            team_id(CompetitionIndex(2), &leader()),
            "2-0x1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn tripped_breaker_short_circuits() {
        let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(60), 1));
        breaker.trip();
        let client =
            IndexerClient::new("http://127.0.0.1:9", Duration::from_secs(1), breaker).unwrap();
        assert_eq!(
            client.competition(ChainId::ArbitrumTestnet, CompetitionIndex(0)),
            Err(SourceError::CircuitBreakerTripped)
        );
    }
}
