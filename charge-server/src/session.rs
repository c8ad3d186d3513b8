//! Client session state.
//!
//! All UI state changes go through [`Session::apply`]: an event comes in,
//! state is updated, and the side effects the caller must perform come out
//! as [`Command`]s. Completed effects are fed back as events carrying the
//! sequence number of the command that started them; anything but the most
//! recently issued number is discarded, so a slow response can never
//! overwrite a newer one.

use crate::domain::{Coordinate, RouteResult, Station};
use crate::gateway::{DEFAULT_MAX_RESULTS, DEFAULT_RADIUS_KM};
use crate::projector::{self, HistogramBucket, ProjectedStation};
use crate::tracker::LocationError;

/// Something that happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The user picked a location (search result or map click).
    LocationSelected(Coordinate),

    /// The tracker produced a fix.
    LocationFixed(Coordinate),

    LocationFailed(LocationError),

    StationsLoaded {
        seq: u64,
        stations: Vec<Station>,
        warning: Option<String>,
    },

    StationsFailed {
        seq: u64,
        message: String,
    },

    /// The user picked a station by id.
    StationSelected(String),

    RouteResolved {
        seq: u64,
        route: RouteResult,
    },

    RouteFailed {
        seq: u64,
        message: String,
    },

    DrivingModeToggled(bool),
}

/// A side effect for the caller to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchStations {
        seq: u64,
        center: Coordinate,
        radius_km: f64,
        max_results: u32,
    },
    ResolveRoute {
        seq: u64,
        from: Coordinate,
        to: Coordinate,
    },
    StartTracking,
    /// Stop tracking and take one fresh fix.
    StopTracking,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub radius_km: f64,
    pub max_results: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// What the view renders.
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    location: Option<Coordinate>,
    stations: Vec<ProjectedStation>,
    histogram: Vec<HistogramBucket>,
    selected: Option<String>,
    route: Option<RouteResult>,
    driving: bool,
    loading: bool,
    error: Option<String>,
    warning: Option<String>,
    station_seq: u64,
    route_seq: u64,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            location: None,
            stations: Vec::new(),
            histogram: projector::histogram(&[]),
            selected: None,
            route: None,
            driving: false,
            loading: false,
            error: None,
            warning: None,
            station_seq: 0,
            route_seq: 0,
        }
    }

    pub fn location(&self) -> Option<Coordinate> {
        self.location
    }

    /// Stations nearest first.
    pub fn stations(&self) -> &[ProjectedStation] {
        &self.stations
    }

    pub fn histogram(&self) -> &[HistogramBucket] {
        &self.histogram
    }

    pub fn selected(&self) -> Option<&ProjectedStation> {
        let id = self.selected.as_deref()?;
        self.stations.iter().find(|p| p.station.id == id)
    }

    pub fn route(&self) -> Option<&RouteResult> {
        self.route.as_ref()
    }

    pub fn is_driving(&self) -> bool {
        self.driving
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Apply an event and return the commands it triggers.
    pub fn apply(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::LocationSelected(at) | Event::LocationFixed(at) => self.relocate(at),

            Event::LocationFailed(e) => {
                self.error = Some(e.to_string());
                Vec::new()
            }

            Event::StationsLoaded {
                seq,
                stations,
                warning,
            } => {
                if seq != self.station_seq {
                    tracing::debug!(seq, latest = self.station_seq, "discarding stale stations");
                    return Vec::new();
                }
                self.loading = false;
                self.error = None;
                self.warning = warning;
                self.show_stations(&stations);
                Vec::new()
            }

            Event::StationsFailed { seq, message } => {
                if seq != self.station_seq {
                    return Vec::new();
                }
                self.loading = false;
                self.error = Some(message);
                Vec::new()
            }

            Event::StationSelected(id) => {
                if !self.stations.iter().any(|p| p.station.id == id) {
                    return Vec::new();
                }
                self.selected = Some(id);
                self.route_to_selection().into_iter().collect()
            }

            Event::RouteResolved { seq, route } => {
                if seq == self.route_seq {
                    self.route = Some(route);
                }
                Vec::new()
            }

            Event::RouteFailed { seq, message } => {
                if seq != self.route_seq {
                    return Vec::new();
                }
                tracing::warn!(%message, "route failed");
                self.route = None;
                if self.driving {
                    self.error = Some(message);
                }
                Vec::new()
            }

            Event::DrivingModeToggled(on) => {
                if on == self.driving {
                    return Vec::new();
                }
                self.driving = on;
                if on {
                    vec![Command::StartTracking]
                } else {
                    vec![Command::StopTracking]
                }
            }
        }
    }

    fn relocate(&mut self, at: Coordinate) -> Vec<Command> {
        self.location = Some(at);
        self.loading = true;
        self.station_seq += 1;

        let mut commands = vec![Command::FetchStations {
            seq: self.station_seq,
            center: at,
            radius_km: self.config.radius_km,
            max_results: self.config.max_results,
        }];
        commands.extend(self.route_to_selection());
        commands
    }

    /// Clear the displayed route and, if a station is selected, request a
    /// new one from the current location.
    ///
    /// The route sequence only moves when there is a route or a selection
    /// whose pending request it must invalidate.
    fn route_to_selection(&mut self) -> Option<Command> {
        if self.route.take().is_none() && self.selected.is_none() {
            return None;
        }
        self.route_seq += 1;

        let from = self.location?;
        let to = self.selected()?.station.coordinate;
        Some(Command::ResolveRoute {
            seq: self.route_seq,
            from,
            to,
        })
    }

    fn show_stations(&mut self, stations: &[Station]) {
        self.stations = match self.location {
            Some(at) => projector::project(at, stations),
            None => Vec::new(),
        };
        self.histogram = projector::histogram(&self.stations);

        if self.selected.is_some() && self.selected().is_none() {
            self.selected = None;
            self.route = None;
            self.route_seq += 1;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
