use crate::core::geo::LatLngBounds;
use crate::data::point::GeoPoint;
use crate::data::provider::{FetchKey, FetchRequest};
use instant::{Duration, Instant};

/// Lifecycle of the one fetch the tracker may have pending.
///
/// Supersession is an explicit transition here, not an implicit
/// timer-clearing side effect: a newer settle replaces a `Scheduled` fetch
/// outright, and an `InFlight` fetch it cannot recall is instead disowned,
/// so its response fails the latest-key comparison on arrival.
#[derive(Debug, Clone, PartialEq)]
enum PendingFetch {
    Idle,
    Scheduled { request: FetchRequest, fire_at: Instant },
    InFlight { request: FetchRequest },
}

/// What became of a completed fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The response matched the latest viewport and replaces the point set
    Applied(Vec<GeoPoint>),
    /// The response was superseded by a newer viewport; not an error
    Discarded,
}

/// Watches viewport settle events and turns them into debounced,
/// viewport-keyed fetch requests.
///
/// The tracker never reads a clock itself: callers pass `now` into every
/// time-sensitive method, which keeps gesture flurries, debounce windows and
/// out-of-order completions exactly reproducible in tests.
#[derive(Debug)]
pub struct ViewportTracker {
    state: PendingFetch,
    /// Key of the newest settle, the only key allowed to apply
    latest_key: Option<FetchKey>,
    /// Key of the last applied response, for duplicate suppression
    applied_key: Option<FetchKey>,
    debounce: Duration,
    precision: usize,
}

impl ViewportTracker {
    pub fn new(debounce: Duration, precision: usize) -> Self {
        Self {
            state: PendingFetch::Idle,
            latest_key: None,
            applied_key: None,
            debounce,
            precision,
        }
    }

    /// Records a viewport settle (move end / zoom end / resize).
    ///
    /// Identical keys never trigger duplicate fetches: a settle matching the
    /// already-applied viewport is a no-op, and one matching an in-flight
    /// fetch just re-arms the latest-key guard. Anything else (re)schedules
    /// the fetch `debounce` from `now`, so a flurry of gestures collapses to
    /// one fetch for the final viewport.
    pub fn note_settle(&mut self, bounds: &LatLngBounds, zoom: f64, now: Instant) {
        let key = FetchKey::new(bounds, zoom, self.precision);

        if self.state == PendingFetch::Idle && self.applied_key.as_ref() == Some(&key) {
            return;
        }
        if let PendingFetch::InFlight { request } = &self.state {
            if request.key == key {
                self.latest_key = Some(key);
                return;
            }
        }

        log::debug!("viewport settled, scheduling fetch for {}", key);
        self.latest_key = Some(key.clone());
        self.state = PendingFetch::Scheduled {
            request: FetchRequest {
                key,
                bounds: bounds.clone(),
                zoom,
            },
            fire_at: now + self.debounce,
        };
    }

    /// Promotes a due scheduled fetch to in-flight and hands it to the
    /// caller for dispatch. Returns None while idle, in flight, or still
    /// inside the debounce window.
    pub fn poll(&mut self, now: Instant) -> Option<FetchRequest> {
        match &self.state {
            PendingFetch::Scheduled { request, fire_at } if now >= *fire_at => {
                let request = request.clone();
                self.state = PendingFetch::InFlight {
                    request: request.clone(),
                };
                Some(request)
            }
            _ => None,
        }
    }

    /// Resolves a completed fetch: applied if it still corresponds to the
    /// latest settled viewport, discarded otherwise (last-viewport-wins,
    /// not last-response-wins).
    pub fn on_response(&mut self, key: &FetchKey, points: Vec<GeoPoint>) -> FetchOutcome {
        let is_latest = self.latest_key.as_ref() == Some(key);
        let matches_in_flight =
            matches!(&self.state, PendingFetch::InFlight { request } if request.key == *key);

        if is_latest && matches_in_flight {
            self.state = PendingFetch::Idle;
            self.applied_key = Some(key.clone());
            FetchOutcome::Applied(points)
        } else {
            log::debug!("discarding superseded fetch response for {}", key);
            FetchOutcome::Discarded
        }
    }

    /// Records a failed fetch. Returns whether the failure concerned the
    /// latest viewport (the caller keeps its previous point set either way
    /// and only surfaces a stale signal when this is true).
    pub fn on_failure(&mut self, key: &FetchKey) -> bool {
        let matches_in_flight =
            matches!(&self.state, PendingFetch::InFlight { request } if request.key == *key);
        if matches_in_flight {
            self.state = PendingFetch::Idle;
        }
        self.latest_key.as_ref() == Some(key)
    }

    /// Whether a fetch is scheduled or in flight
    pub fn is_busy(&self) -> bool {
        self.state != PendingFetch::Idle
    }

    /// When the scheduled fetch becomes due, if one is scheduled
    pub fn next_due(&self) -> Option<Instant> {
        match &self.state {
            PendingFetch::Scheduled { fire_at, .. } => Some(*fire_at),
            _ => None,
        }
    }

    pub fn latest_key(&self) -> Option<&FetchKey> {
        self.latest_key.as_ref()
    }
}
