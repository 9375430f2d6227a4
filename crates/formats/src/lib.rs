pub mod conflict;
pub mod event;
pub mod geojson;
pub mod hazard;
pub mod ingest;
pub mod news;
pub mod seismic;
pub mod thermal;
pub mod wire;

pub use conflict::ConflictAdapter;
pub use event::*;
pub use hazard::HazardAdapter;
pub use ingest::*;
pub use news::{NewsAdapter, NewsTimespan};
pub use seismic::SeismicAdapter;
pub use thermal::ThermalAdapter;
pub use wire::decode_batch;

/// The adapter that reads `kind`'s upstream wire format.
pub fn adapter(kind: SourceKind) -> &'static dyn SourceAdapter {
    static SEISMIC: SeismicAdapter = SeismicAdapter;
    static HAZARD: HazardAdapter = HazardAdapter;
    static THERMAL: ThermalAdapter = ThermalAdapter;
    static CONFLICT: ConflictAdapter = ConflictAdapter;
    static NEWS: NewsAdapter = NewsAdapter;

    match kind {
        SourceKind::Seismic => &SEISMIC,
        SourceKind::Hazard => &HAZARD,
        SourceKind::Thermal => &THERMAL,
        SourceKind::Conflict => &CONFLICT,
        SourceKind::News => &NEWS,
    }
}
