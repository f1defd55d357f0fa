use crate::errors::Result;
use crate::records::{Coordinates, Provider};
use crate::store::Store;

/// great-circle distance in km via the haversine formula
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    const R: f64 = 6371.0; // Earth radius in km

    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().asin();
    R * c
}

/// distance filter around a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearFilter {
    pub origin: Coordinates,
    pub radius_km: f64,
}

/// public provider search query
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// case-insensitive business-name match
    pub text: Option<String>,
    /// case-insensitive category equality
    pub category: Option<String>,
    pub near: Option<NearFilter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub provider: Provider,
    pub distance_km: Option<f64>,
}

/// search visible providers. locked providers never appear; the distance
/// filter reads only published coordinates, so a provider's live position
/// is never exposed regardless of lock state.
pub fn search(store: &dyn Store, query: &SearchQuery) -> Result<Vec<SearchHit>> {
    let text = query.text.as_deref().map(str::to_lowercase);
    let category = query.category.as_deref().map(str::to_lowercase);

    let mut hits: Vec<SearchHit> = store
        .providers()?
        .into_iter()
        .filter(|p| !p.is_locked)
        .filter(|p| match &category {
            Some(c) => p.category.to_lowercase() == *c,
            None => true,
        })
        .filter(|p| match &text {
            Some(t) => p.business_name.to_lowercase().contains(t),
            None => true,
        })
        .map(|p| SearchHit {
            provider: p,
            distance_km: None,
        })
        .collect();

    if let Some(near) = query.near {
        hits.retain_mut(|hit| match hit.provider.published_location {
            Some(published) => {
                let distance = haversine_km(near.origin, published);
                hit.distance_km = Some(distance);
                distance <= near.radius_km
            }
            None => false,
        });
        // stable sort keeps insertion order for equal distances
        hits.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    Ok(hits)
}
