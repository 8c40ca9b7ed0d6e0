use std::collections::HashMap;

use async_trait::async_trait;
use common::{BookUid, LibraryUid, ReservationUid, USER_NAME_HEADER, UserName};
use domain::{Book, CreateReservation, Library, Rating, Reservation, ReservationStatus};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    BackendConfig, Result, ServiceError,
    service::{
        BookQuery, CatalogService, LibraryQuery, RatingService, RawResponse, ReservationService,
    },
};

/// Batch lookups wrap their items in `{ "data": [...] }`.
#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRatingBody<'a> {
    user_name: &'a str,
}

/// Sends a request and splits the answer into success and [`ServiceError::Upstream`].
async fn send(request: RequestBuilder) -> Result<RawResponse> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        tracing::debug!(%status, "backend answered with non-success status");
        return Err(ServiceError::upstream(status, body));
    }

    Ok(RawResponse::new(status, body))
}

/// Parses a backend base URL, rejecting ones that cannot take path segments.
fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
    }
    Ok(url)
}

/// Appends `segments` to `base`, percent-encoding each one.
///
/// An empty final segment yields a trailing slash.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn push_param<'a>(
    params: &mut Vec<(&'static str, &'a str)>,
    key: &'static str,
    value: &'a Option<String>,
) {
    if let Some(value) = value {
        params.push((key, value.as_str()));
    }
}

/// The three HTTP clients, sharing one connection pool.
#[derive(Clone)]
pub struct HttpBackends {
    pub catalog: HttpCatalogService,
    pub reservations: HttpReservationService,
    pub ratings: HttpRatingService,
}

impl HttpBackends {
    /// Builds all three clients from the backend configuration.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self {
            catalog: HttpCatalogService::new(client.clone(), parse_base(&config.library_url)?),
            reservations: HttpReservationService::new(
                client.clone(),
                parse_base(&config.reservation_url)?,
            ),
            ratings: HttpRatingService::new(client, parse_base(&config.rating_url)?),
        })
    }
}

/// Catalog service over HTTP.
#[derive(Clone)]
pub struct HttpCatalogService {
    client: Client,
    base_url: Url,
}

impl HttpCatalogService {
    /// Creates a client for the catalog service at `base_url`.
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint(&self.base_url, segments)
    }
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    async fn list_libraries(&self, user: &UserName, query: &LibraryQuery) -> Result<RawResponse> {
        let mut params = Vec::new();
        push_param(&mut params, "city", &query.city);
        push_param(&mut params, "page", &query.page);
        push_param(&mut params, "size", &query.size);

        send(
            self.client
                .get(self.url(&["libraries"]))
                .header(USER_NAME_HEADER, user.as_str())
                .query(&params),
        )
        .await
    }

    async fn list_library_books(
        &self,
        user: &UserName,
        library_uid: LibraryUid,
        query: &BookQuery,
    ) -> Result<RawResponse> {
        let mut params = Vec::new();
        push_param(&mut params, "page", &query.page);
        push_param(&mut params, "size", &query.size);
        push_param(&mut params, "showAll", &query.show_all);

        send(
            self.client
                .get(self.url(&["libraries", &library_uid.to_string(), "books"]))
                .header(USER_NAME_HEADER, user.as_str())
                .query(&params),
        )
        .await
    }

    async fn books_by_uids(
        &self,
        user: &UserName,
        uids: &[BookUid],
    ) -> Result<HashMap<BookUid, Book>> {
        if uids.is_empty() {
            return Ok(HashMap::new());
        }
        let params: Vec<(&str, String)> = uids
            .iter()
            .map(|uid| ("bookUids", uid.to_string()))
            .collect();

        let envelope: DataEnvelope<Book> = send(
            self.client
                .get(self.url(&["books", ""]))
                .header(USER_NAME_HEADER, user.as_str())
                .query(&params),
        )
        .await?
        .json()?;

        Ok(envelope
            .data
            .into_iter()
            .map(|book| (book.book_uid, book))
            .collect())
    }

    async fn libraries_by_uids(
        &self,
        user: &UserName,
        uids: &[LibraryUid],
    ) -> Result<HashMap<LibraryUid, Library>> {
        if uids.is_empty() {
            return Ok(HashMap::new());
        }
        let params: Vec<(&str, String)> = uids
            .iter()
            .map(|uid| ("libraryUids", uid.to_string()))
            .collect();

        let envelope: DataEnvelope<Library> = send(
            self.client
                .get(self.url(&["libraries", "by-uids"]))
                .header(USER_NAME_HEADER, user.as_str())
                .query(&params),
        )
        .await?
        .json()?;

        Ok(envelope
            .data
            .into_iter()
            .map(|library| (library.library_uid, library))
            .collect())
    }

    async fn update_available_count(
        &self,
        user: &UserName,
        library_uid: LibraryUid,
        book_uid: BookUid,
        delta: i32,
    ) -> Result<()> {
        send(
            self.client
                .put(self.url(&[
                    "libraries",
                    &library_uid.to_string(),
                    "books",
                    &book_uid.to_string(),
                ]))
                .header(USER_NAME_HEADER, user.as_str())
                .query(&[("countDiff", delta)]),
        )
        .await?;
        Ok(())
    }
}

/// Reservation service over HTTP.
#[derive(Clone)]
pub struct HttpReservationService {
    client: Client,
    base_url: Url,
}

impl HttpReservationService {
    /// Creates a client for the reservation service at `base_url`.
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint(&self.base_url, segments)
    }
}

#[async_trait]
impl ReservationService for HttpReservationService {
    async fn user_reservations(
        &self,
        user: &UserName,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>> {
        let mut request = self
            .client
            .get(self.url(&["reservations", "by-user", user.as_str()]))
            .header(USER_NAME_HEADER, user.as_str());
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }

        send(request).await?.json()
    }

    async fn reservation(&self, user: &UserName, uid: ReservationUid) -> Result<Reservation> {
        send(
            self.client
                .get(self.url(&["reservations", &uid.to_string()]))
                .header(USER_NAME_HEADER, user.as_str()),
        )
        .await?
        .json()
    }

    async fn create_reservation(
        &self,
        user: &UserName,
        request: &CreateReservation,
    ) -> Result<Reservation> {
        send(
            self.client
                .post(self.url(&["reservations", ""]))
                .header(USER_NAME_HEADER, user.as_str())
                .json(request),
        )
        .await?
        .json()
    }

    async fn delete_reservation(&self, user: &UserName, uid: ReservationUid) -> Result<()> {
        send(
            self.client
                .delete(self.url(&["reservations", &uid.to_string()]))
                .header(USER_NAME_HEADER, user.as_str()),
        )
        .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        user: &UserName,
        uid: ReservationUid,
        status: ReservationStatus,
    ) -> Result<()> {
        send(
            self.client
                .put(self.url(&["reservations", &uid.to_string(), "status"]))
                .header(USER_NAME_HEADER, user.as_str())
                .query(&[("status", status.as_str())]),
        )
        .await?;
        Ok(())
    }
}

/// Rating service over HTTP.
#[derive(Clone)]
pub struct HttpRatingService {
    client: Client,
    base_url: Url,
}

impl HttpRatingService {
    /// Creates a client for the rating service at `base_url`.
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint(&self.base_url, segments)
    }
}

#[async_trait]
impl RatingService for HttpRatingService {
    async fn rating_raw(&self, user: &UserName) -> Result<RawResponse> {
        send(
            self.client
                .get(self.url(&["rating", user.as_str()]))
                .header(USER_NAME_HEADER, user.as_str()),
        )
        .await
    }

    async fn create_rating(&self, user: &UserName) -> Result<Rating> {
        send(
            self.client
                .post(self.url(&["rating", ""]))
                .header(USER_NAME_HEADER, user.as_str())
                .json(&CreateRatingBody {
                    user_name: user.as_str(),
                }),
        )
        .await?
        .json()
    }

    async fn update_stars(&self, user: &UserName, delta: i32) -> Result<()> {
        send(
            self.client
                .put(self.url(&["rating", user.as_str()]))
                .header(USER_NAME_HEADER, user.as_str())
                .query(&[("starsDiff", delta)]),
        )
        .await?;
        Ok(())
    }
}
