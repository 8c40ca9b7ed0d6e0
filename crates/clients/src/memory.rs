use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{BookUid, LibraryUid, ReservationUid, UserName};
use domain::{Book, CreateReservation, Library, Rating, Reservation, ReservationStatus};
use http::StatusCode;

use crate::{
    Result, ServiceError,
    service::{
        BookQuery, CatalogService, LibraryQuery, RatingService, RawResponse, ReservationService,
    },
};

/// Ordered record of the mutations applied across in-memory services.
///
/// Share one journal between the three services to assert the order in which
/// a saga applied and compensated its steps.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    /// Returns all entries in the order they were recorded.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// Remaining forced failures for one operation.
#[derive(Debug, Default, Clone, Copy)]
struct FailSwitch(usize);

impl FailSwitch {
    fn set(&mut self, fail: bool) {
        self.0 = if fail { usize::MAX } else { 0 };
    }

    /// Consumes one failure if any is armed.
    fn fire(&mut self) -> bool {
        match self.0 {
            0 => false,
            usize::MAX => true,
            _ => {
                self.0 -= 1;
                true
            }
        }
    }
}

fn unavailable(service: &str) -> ServiceError {
    ServiceError::upstream(
        StatusCode::SERVICE_UNAVAILABLE,
        format!(r#"{{"message":"{service} unavailable"}}"#),
    )
}

fn not_found(what: &str) -> ServiceError {
    ServiceError::upstream(
        StatusCode::NOT_FOUND,
        format!(r#"{{"message":"{what} not found"}}"#),
    )
}

fn json_response(value: &serde_json::Value) -> Result<RawResponse> {
    Ok(RawResponse::new(StatusCode::OK, serde_json::to_vec(value)?))
}

// -- Catalog --

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    libraries: HashMap<LibraryUid, Library>,
    books: HashMap<BookUid, Book>,
    available: HashMap<(LibraryUid, BookUid), i64>,
    fail_on_lookup: FailSwitch,
    fail_on_update_count: FailSwitch,
    failing_deltas: HashSet<i32>,
    update_count_calls: usize,
}

/// In-memory catalog service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogService {
    state: Arc<Mutex<InMemoryCatalogState>>,
    journal: CallJournal,
}

impl InMemoryCatalogService {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty catalog recording mutations into `journal`.
    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            state: Arc::default(),
            journal,
        }
    }

    /// Adds a library.
    pub fn add_library(&self, library: Library) {
        self.state
            .lock()
            .unwrap()
            .libraries
            .insert(library.library_uid, library);
    }

    /// Adds a book to a library with the given available count.
    pub fn add_book(&self, library_uid: LibraryUid, book: Book, available: i64) {
        let mut state = self.state.lock().unwrap();
        state.available.insert((library_uid, book.book_uid), available);
        state.books.insert(book.book_uid, book);
    }

    /// Returns a book's available count in a library.
    pub fn available_count(&self, library_uid: LibraryUid, book_uid: BookUid) -> Option<i64> {
        self.state
            .lock()
            .unwrap()
            .available
            .get(&(library_uid, book_uid))
            .copied()
    }

    /// Makes every lookup (listings and batch fetches) fail with 503.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_lookup.set(fail);
    }

    /// Makes every available-count update fail with 503.
    pub fn set_fail_on_update_count(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_update_count.set(fail);
    }

    /// Makes the next `times` available-count updates fail with 503.
    pub fn fail_update_count_times(&self, times: usize) {
        self.state.lock().unwrap().fail_on_update_count = FailSwitch(times);
    }

    /// Makes every available-count update by exactly `delta` fail with 503.
    pub fn fail_update_count_by(&self, delta: i32) {
        self.state.lock().unwrap().failing_deltas.insert(delta);
    }

    /// Returns how many available-count updates were attempted.
    pub fn update_count_calls(&self) -> usize {
        self.state.lock().unwrap().update_count_calls
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn list_libraries(&self, _user: &UserName, query: &LibraryQuery) -> Result<RawResponse> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_lookup.fire() {
            return Err(unavailable("library service"));
        }

        let items: Vec<&Library> = state
            .libraries
            .values()
            .filter(|l| query.city.as_deref().is_none_or(|city| l.city == city))
            .collect();
        json_response(&serde_json::json!({
            "page": 1,
            "pageSize": items.len(),
            "totalElements": items.len(),
            "items": items,
        }))
    }

    async fn list_library_books(
        &self,
        _user: &UserName,
        library_uid: LibraryUid,
        _query: &BookQuery,
    ) -> Result<RawResponse> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_lookup.fire() {
            return Err(unavailable("library service"));
        }
        if !state.libraries.contains_key(&library_uid) {
            return Err(not_found("library"));
        }

        let items: Vec<serde_json::Value> = state
            .available
            .iter()
            .filter(|((lib, _), _)| *lib == library_uid)
            .filter_map(|((_, book_uid), count)| {
                let book = state.books.get(book_uid)?;
                let mut value = serde_json::to_value(book).ok()?;
                value["availableCount"] = serde_json::json!(count);
                Some(value)
            })
            .collect();
        json_response(&serde_json::json!({
            "page": 1,
            "pageSize": items.len(),
            "totalElements": items.len(),
            "items": items,
        }))
    }

    async fn books_by_uids(
        &self,
        _user: &UserName,
        uids: &[BookUid],
    ) -> Result<HashMap<BookUid, Book>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_lookup.fire() {
            return Err(unavailable("library service"));
        }
        Ok(uids
            .iter()
            .filter_map(|uid| state.books.get(uid).map(|b| (*uid, b.clone())))
            .collect())
    }

    async fn libraries_by_uids(
        &self,
        _user: &UserName,
        uids: &[LibraryUid],
    ) -> Result<HashMap<LibraryUid, Library>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_lookup.fire() {
            return Err(unavailable("library service"));
        }
        Ok(uids
            .iter()
            .filter_map(|uid| state.libraries.get(uid).map(|l| (*uid, l.clone())))
            .collect())
    }

    async fn update_available_count(
        &self,
        _user: &UserName,
        library_uid: LibraryUid,
        book_uid: BookUid,
        delta: i32,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.update_count_calls += 1;
        if state.failing_deltas.contains(&delta) || state.fail_on_update_count.fire() {
            return Err(unavailable("library service"));
        }

        let count = state
            .available
            .get_mut(&(library_uid, book_uid))
            .ok_or_else(|| not_found("book"))?;
        *count += i64::from(delta);
        self.journal
            .record(format!("catalog.update_available_count({delta:+})"));
        Ok(())
    }
}

// -- Reservations --

#[derive(Debug, Default)]
struct InMemoryReservationState {
    reservations: HashMap<ReservationUid, (UserName, Reservation)>,
    fail_on_lookup: FailSwitch,
    fail_on_create: FailSwitch,
    fail_on_delete: FailSwitch,
    failing_statuses: HashSet<ReservationStatus>,
}

/// In-memory reservation service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReservationService {
    state: Arc<Mutex<InMemoryReservationState>>,
    journal: CallJournal,
}

impl InMemoryReservationService {
    /// Creates an empty reservation service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty reservation service recording mutations into `journal`.
    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            state: Arc::default(),
            journal,
        }
    }

    /// Stores an existing reservation for a user.
    pub fn insert(&self, user: &UserName, reservation: Reservation) {
        self.state
            .lock()
            .unwrap()
            .reservations
            .insert(reservation.reservation_uid, (user.clone(), reservation));
    }

    /// Returns a stored reservation.
    pub fn get(&self, uid: ReservationUid) -> Option<Reservation> {
        self.state
            .lock()
            .unwrap()
            .reservations
            .get(&uid)
            .map(|(_, r)| r.clone())
    }

    /// Returns how many reservations a user has, in any status.
    pub fn count_for(&self, user: &UserName) -> usize {
        self.state
            .lock()
            .unwrap()
            .reservations
            .values()
            .filter(|(owner, _)| owner == user)
            .count()
    }

    /// Makes listing and fetching reservations fail with 503.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_lookup.set(fail);
    }

    /// Makes reservation creation fail with 503.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_create.set(fail);
    }

    /// Makes reservation deletion fail with 503.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_delete.set(fail);
    }

    /// Makes every status update that sets `status` fail with 503.
    pub fn fail_status_updates_to(&self, status: ReservationStatus) {
        self.state.lock().unwrap().failing_statuses.insert(status);
    }
}

#[async_trait]
impl ReservationService for InMemoryReservationService {
    async fn user_reservations(
        &self,
        user: &UserName,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_lookup.fire() {
            return Err(unavailable("reservation service"));
        }
        Ok(state
            .reservations
            .values()
            .filter(|(owner, r)| owner == user && status.is_none_or(|s| r.status == s))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn reservation(&self, _user: &UserName, uid: ReservationUid) -> Result<Reservation> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_lookup.fire() {
            return Err(unavailable("reservation service"));
        }
        state
            .reservations
            .get(&uid)
            .map(|(_, r)| r.clone())
            .ok_or_else(|| not_found("reservation"))
    }

    async fn create_reservation(
        &self,
        user: &UserName,
        request: &CreateReservation,
    ) -> Result<Reservation> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_create.fire() {
            return Err(unavailable("reservation service"));
        }

        let reservation = Reservation {
            reservation_uid: ReservationUid::new(),
            status: ReservationStatus::Rented,
            start_date: chrono::Utc::now().date_naive(),
            till_date: request.till_date,
            book_uid: request.book_uid,
            library_uid: request.library_uid,
        };
        state.reservations.insert(
            reservation.reservation_uid,
            (user.clone(), reservation.clone()),
        );
        self.journal.record("reservation.create".to_string());
        Ok(reservation)
    }

    async fn delete_reservation(&self, _user: &UserName, uid: ReservationUid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_delete.fire() {
            return Err(unavailable("reservation service"));
        }
        state
            .reservations
            .remove(&uid)
            .ok_or_else(|| not_found("reservation"))?;
        self.journal.record("reservation.delete".to_string());
        Ok(())
    }

    async fn update_status(
        &self,
        _user: &UserName,
        uid: ReservationUid,
        status: ReservationStatus,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_statuses.contains(&status) {
            return Err(unavailable("reservation service"));
        }
        let (_, reservation) = state
            .reservations
            .get_mut(&uid)
            .ok_or_else(|| not_found("reservation"))?;
        reservation.status = status;
        self.journal
            .record(format!("reservation.update_status({status})"));
        Ok(())
    }
}

// -- Ratings --

/// Star count given to a user the rating service has never seen.
pub const DEFAULT_STARS: u32 = 1;

#[derive(Debug, Default)]
struct InMemoryRatingState {
    stars: HashMap<UserName, u32>,
    fail_on_lookup: FailSwitch,
    fail_on_create: FailSwitch,
    fail_on_update: FailSwitch,
}

/// In-memory rating service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRatingService {
    state: Arc<Mutex<InMemoryRatingState>>,
    journal: CallJournal,
}

impl InMemoryRatingService {
    /// Creates an empty rating service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty rating service recording mutations into `journal`.
    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            state: Arc::default(),
            journal,
        }
    }

    /// Sets a user's star count.
    pub fn set_stars(&self, user: &UserName, stars: u32) {
        self.state.lock().unwrap().stars.insert(user.clone(), stars);
    }

    /// Returns a user's star count, if the user is known.
    pub fn stars(&self, user: &UserName) -> Option<u32> {
        self.state.lock().unwrap().stars.get(user).copied()
    }

    /// Makes rating lookups fail with 503.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_lookup.set(fail);
    }

    /// Makes rating creation fail with 503.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_create.set(fail);
    }

    /// Makes star updates fail with 503.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_update.set(fail);
    }

    /// Makes the next `times` star updates fail with 503.
    pub fn fail_update_times(&self, times: usize) {
        self.state.lock().unwrap().fail_on_update = FailSwitch(times);
    }
}

#[async_trait]
impl RatingService for InMemoryRatingService {
    async fn rating_raw(&self, user: &UserName) -> Result<RawResponse> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_lookup.fire() {
            return Err(unavailable("rating service"));
        }
        let stars = state.stars.get(user).ok_or_else(|| not_found("rating"))?;
        json_response(&serde_json::json!({ "stars": stars }))
    }

    async fn create_rating(&self, user: &UserName) -> Result<Rating> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_create.fire() {
            return Err(unavailable("rating service"));
        }
        let stars = *state.stars.entry(user.clone()).or_insert(DEFAULT_STARS);
        self.journal.record("rating.create".to_string());
        Ok(Rating {
            user_name: Some(user.clone()),
            stars,
        })
    }

    async fn update_stars(&self, user: &UserName, delta: i32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_update.fire() {
            return Err(unavailable("rating service"));
        }
        let stars = state
            .stars
            .get_mut(user)
            .ok_or_else(|| not_found("rating"))?;
        *stars = stars.saturating_add_signed(delta);
        self.journal.record(format!("rating.update_stars({delta:+})"));
        Ok(())
    }
}
