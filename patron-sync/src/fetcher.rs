//! Membership API client
//!
//! Pulls every active member of one campaign from the Patreon v2
//! `campaigns/{id}/members` endpoint, following cursor pagination until the
//! API stops signaling a next page.
//!
//! # API Reference
//! - Endpoint: https://www.patreon.com/api/oauth2/v2/campaigns/{campaign_id}/members
//! - Envelope: JSON:API (`data`, `included`, `links.next`, `meta.pagination.cursors.next`)
//! - Auth: `Authorization: Bearer <creator access token>`

use crate::error::{FetchError, MalformedRecord};
use crate::models::Supporter;
use patron_common::config::SyncConfig;
use patron_common::time::parse_timestamp;
use reqwest::{header, Client, StatusCode, Url};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for a single page request
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Pause before the one retry of a failed connection
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

const USER_AGENT: &str = concat!("patron-sync/", env!("CARGO_PKG_VERSION"));

/// `patron_status` of a member in good standing
pub const ACTIVE_PATRON_STATUS: &str = "active_patron";

/// Name used when neither the user nor the member carries one
pub const ANONYMOUS_NAME: &str = "Anonymous";

const MEMBER_FIELDS: &str = "full_name,patron_status,last_charge_date,pledge_relationship_start";

// ============================================================================
// API Response Types
// ============================================================================

/// One page of the members listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembersPage {
    #[serde(default)]
    pub data: Vec<ApiMember>,
    #[serde(default)]
    pub included: Vec<ApiIncluded>,
    #[serde(default)]
    pub links: Option<PageLinks>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMember {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: MemberAttributes,
    #[serde(default)]
    pub relationships: Option<MemberRelationships>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberAttributes {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub patron_status: Option<String>,
    #[serde(default)]
    pub last_charge_date: Option<String>,
    #[serde(default)]
    pub pledge_relationship_start: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberRelationships {
    #[serde(default)]
    pub user: Option<Relationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<ResourceIdentifier>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
}

/// Sideloaded resource (`include=user`)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiIncluded {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Option<UserAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAttributes {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub pagination: Option<PaginationMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationMeta {
    #[serde(default)]
    pub cursors: Option<PageCursors>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageCursors {
    #[serde(default)]
    pub next: Option<String>,
}

impl ApiMember {
    /// Whether the member's status is `active_patron`
    pub fn is_active(&self) -> bool {
        self.attributes.patron_status.as_deref() == Some(ACTIVE_PATRON_STATUS)
    }
}

impl MembersPage {
    /// Map of included user id to full name
    pub fn user_names(&self) -> HashMap<&str, &str> {
        self.included
            .iter()
            .filter(|resource| resource.kind == "user")
            .filter_map(|resource| {
                let name = resource.attributes.as_ref()?.full_name.as_deref()?;
                Some((resource.id.as_str(), name))
            })
            .collect()
    }

    /// Opaque cursor for the next page, if any
    pub fn next_cursor(&self) -> Option<&str> {
        self.meta
            .as_ref()?
            .pagination
            .as_ref()?
            .cursors
            .as_ref()?
            .next
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }

    /// Member count the API reports for the whole campaign
    pub fn total(&self) -> Option<u64> {
        self.meta.as_ref()?.pagination.as_ref()?.total
    }

    /// Absolute next-page link, if any
    pub fn next_link(&self) -> Option<&str> {
        self.links
            .as_ref()?
            .next
            .as_deref()
            .filter(|link| !link.is_empty())
    }
}

/// Convert one API member into a supporter
///
/// Display name comes from the included user, then the member itself, then
/// falls back to "Anonymous". A missing or unparseable pledge start is kept
/// as `None` so the member still gets a tier.
pub fn member_to_supporter(
    member: &ApiMember,
    user_names: &HashMap<&str, &str>,
) -> Result<Supporter, MalformedRecord> {
    let member_id = member
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(MalformedRecord::MissingId)?;

    let user_name = member
        .relationships
        .as_ref()
        .and_then(|r| r.user.as_ref())
        .and_then(|u| u.data.as_ref())
        .and_then(|data| user_names.get(data.id.as_str()).copied());

    let displayed_name = [user_name, member.attributes.full_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(ANONYMOUS_NAME);

    let raw_start = member.attributes.pledge_relationship_start.as_deref();
    let pledge_start = raw_start.and_then(parse_timestamp);
    match (raw_start, pledge_start) {
        (None, _) => warn!(
            member_id = %member_id,
            "Member has no pledge start; classifying with zero tenure"
        ),
        (Some(raw), None) => warn!(
            member_id = %member_id,
            pledge_start = %raw,
            "Unparseable pledge start; classifying with zero tenure"
        ),
        _ => {}
    }

    let last_payment_timestamp = member
        .attributes
        .last_charge_date
        .as_deref()
        .map(str::trim)
        .filter(|ts| !ts.is_empty());

    let mut supporter = Supporter::new(member_id, displayed_name);
    if let Some(start) = pledge_start {
        supporter = supporter.with_pledge_start(start);
    }
    if let Some(timestamp) = last_payment_timestamp {
        supporter = supporter.with_last_payment(timestamp);
    }
    Ok(supporter)
}

// ============================================================================
// Client
// ============================================================================

/// Patreon members API client
pub struct PatreonClient {
    http_client: Client,
    base_url: String,
    campaign_id: String,
    access_token: String,
    page_size: u32,
    retry_delay: Duration,
}

impl PatreonClient {
    pub fn new(config: &SyncConfig) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.clone(),
            campaign_id: config.campaign_id.clone(),
            access_token: config.access_token.clone(),
            page_size: config.page_size,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Override the pause before retrying a failed connection
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// URL of the first members page, with include/fields/page size set
    pub fn first_page_url(&self) -> Result<Url, FetchError> {
        let endpoint = format!("{}/campaigns/{}/members", self.base_url, self.campaign_id);
        let page_size = self.page_size.to_string();

        Url::parse_with_params(
            &endpoint,
            [
                ("include", "user"),
                ("fields[member]", MEMBER_FIELDS),
                ("fields[user]", "full_name"),
                ("page[count]", page_size.as_str()),
            ],
        )
        .map_err(|e| FetchError::Setup(format!("Invalid members URL {}: {}", endpoint, e)))
    }

    /// Fetch every active supporter of the campaign
    ///
    /// All-or-nothing: an error on any page discards everything fetched so far.
    pub async fn fetch_active_supporters(&self) -> Result<Vec<Supporter>, FetchError> {
        let first_url = self.first_page_url()?;
        let mut url = first_url.clone();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(url.to_string());

        let mut supporters = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut page_number = 0usize;
        let mut records = 0usize;
        let mut reported_total = None;
        let mut inactive = 0usize;
        let mut skipped = 0usize;

        loop {
            page_number += 1;
            let page = self.fetch_page(&url, page_number).await?;
            let user_names = page.user_names();
            records += page.data.len();
            if reported_total.is_none() {
                reported_total = page.total();
            }

            for member in &page.data {
                if !member.is_active() {
                    inactive += 1;
                    continue;
                }

                match member_to_supporter(member, &user_names) {
                    Ok(supporter) => {
                        if seen_ids.insert(supporter.member_id.clone()) {
                            supporters.push(supporter);
                        } else {
                            debug!(
                                member_id = %supporter.member_id,
                                "Member repeated across pages; keeping first occurrence"
                            );
                        }
                    }
                    Err(e) => {
                        skipped += 1;
                        warn!(page = page_number, error = %e, "Skipping malformed member");
                    }
                }
            }

            debug!(
                page = page_number,
                members = page.data.len(),
                total_active = supporters.len(),
                "Processed members page"
            );

            let Some(next_url) = next_page_url(&page, &url, &first_url)? else {
                break;
            };

            if !visited.insert(next_url.to_string()) {
                return Err(FetchError::PaginationLoop(next_url.to_string()));
            }
            url = next_url;
        }

        if let Some(total) = reported_total {
            if total != records as u64 {
                warn!(
                    reported = total,
                    received = records,
                    "Member count differs from the total the API reported"
                );
            }
        }

        info!(
            pages = page_number,
            active = supporters.len(),
            inactive = inactive,
            skipped = skipped,
            "Fetched active supporters"
        );

        Ok(supporters)
    }

    /// Fetch one page, retrying once on a connection failure
    async fn fetch_page(&self, url: &Url, page_number: usize) -> Result<MembersPage, FetchError> {
        match self.request_page(url, page_number).await {
            Err(FetchError::TransientNetwork(reason)) => {
                warn!(
                    page = page_number,
                    error = %reason,
                    retry_in_ms = self.retry_delay.as_millis() as u64,
                    "Members request failed; retrying once"
                );
                tokio::time::sleep(self.retry_delay).await;
                self.request_page(url, page_number).await
            }
            other => other,
        }
    }

    async fn request_page(&self, url: &Url, page_number: usize) -> Result<MembersPage, FetchError> {
        debug!(page = page_number, url = %url, "Requesting members page");

        let response = self
            .http_client
            .get(url.clone())
            .bearer_auth(&self.access_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::TransientNetwork(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Auth(status.as_u16()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            warn!(
                retry_after = retry_after.as_deref().unwrap_or("unspecified"),
                "Membership API rate limit hit; abandoning this run"
            );
            return Err(FetchError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::TransientNetwork(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            FetchError::Parse(format!("Failed to parse members page {}: {}", page_number, e))
        })
    }
}

/// Resolve the URL of the page after `page`
///
/// `links.next` wins when present (resolved against the current URL);
/// otherwise a bare cursor is appended to the first-page query.
pub fn next_page_url(
    page: &MembersPage,
    current: &Url,
    first: &Url,
) -> Result<Option<Url>, FetchError> {
    if let Some(link) = page.next_link() {
        return current
            .join(link)
            .map(Some)
            .map_err(|e| FetchError::Parse(format!("Invalid next link {}: {}", link, e)));
    }

    Ok(page.next_cursor().map(|cursor| {
        let mut next = first.clone();
        next.query_pairs_mut().append_pair("page[cursor]", cursor);
        next
    }))
}
