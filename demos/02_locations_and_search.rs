/// locations and search - publish/lock flow and proximity search
use marketplace_billing_rs::{
    search, Coordinates, LocationEngine, MemoryStore, NearFilter, Provider, SearchQuery, Store,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== locations and search example ===\n");

    let store = Arc::new(MemoryStore::new());
    let locations = LocationEngine::new(store.clone());

    // three barbers around Georgetown
    let mut ids = Vec::new();
    for (name, lat, lng) in [
        ("Sharp Cutz", 6.8100, -58.1600),
        ("Coastal Fades", 6.9000, -58.3000),
        ("Stabroek Styles", 6.8050, -58.1620),
    ] {
        let provider = Provider::new("+5926000000", name, "barber");
        let id = provider.id;
        store.insert_provider(provider)?;
        locations.set_current(id, lat, lng, None)?;
        ids.push(id);
    }

    // only the first two publish; the third stays private
    locations.publish(ids[0], Some("Shop front, Main St"))?;
    locations.publish(ids[1], Some("Beach road stand"))?;

    // a published pin is a snapshot: moving afterwards changes nothing public
    locations.set_current(ids[0], 6.8150, -58.1700, None)?;
    println!("Sharp Cutz moved, published pin unchanged");

    // republishing requires an explicit unlock first
    match locations.publish(ids[0], None) {
        Err(e) => println!("republish while locked: {e}"),
        Ok(_) => unreachable!(),
    }
    locations.unlock(ids[0])?;
    locations.publish(ids[0], Some("New shop, Water St"))?;
    println!("unlocked and republished at the new spot\n");

    // proximity search from Stabroek Market, 25 km radius
    let query = SearchQuery {
        category: Some("barber".to_string()),
        near: Some(NearFilter {
            origin: Coordinates::new(6.8013, -58.1551),
            radius_km: 25.0,
        }),
        ..Default::default()
    };
    let hits = search(store.as_ref(), &query)?;

    println!("barbers within 25 km of Stabroek Market:");
    for hit in &hits {
        println!(
            "  {} - {:.1} km ({})",
            hit.provider.business_name,
            hit.distance_km.unwrap_or_default(),
            hit.provider.published_label.as_deref().unwrap_or("no label"),
        );
    }
    println!("\nStabroek Styles never published, so it is absent despite being closest");

    Ok(())
}
