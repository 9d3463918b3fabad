use rust_decimal::Decimal;

use intake_core::domain::property::NewProperty;

/// Demo listings loaded by `intake seed`. Identifiers are fixed so a second
/// seed run can detect what is already present.
struct DemoListing {
    identifier: &'static str,
    name: &'static str,
    description: &'static str,
    price: i64,
    location: &'static str,
    bedrooms: i32,
    bathrooms: i32,
    is_available: bool,
}

const DEMO_LISTINGS: &[DemoListing] = &[
    DemoListing {
        identifier: "47237",
        name: "Palm Court Duplex",
        description: "Four bedroom semi-detached duplex with boys quarters and fitted kitchen",
        price: 185_000,
        location: "Lekki Phase 1",
        bedrooms: 4,
        bathrooms: 5,
        is_available: true,
    },
    DemoListing {
        identifier: "31840",
        name: "Express Road Bungalow",
        description: "Three bedroom bungalow on a half plot, gated estate",
        price: 95_000,
        location: "Express Road",
        bedrooms: 3,
        bathrooms: 3,
        is_available: true,
    },
    DemoListing {
        identifier: "58012",
        name: "Harbour View Apartment",
        description: "Serviced two bedroom apartment with lagoon view",
        price: 210_000,
        location: "Victoria Island",
        bedrooms: 2,
        bathrooms: 2,
        is_available: true,
    },
    DemoListing {
        identifier: "64421",
        name: "Garden Terrace",
        description: "Three bedroom terrace with private garden",
        price: 160_000,
        location: "Ikoyi",
        bedrooms: 3,
        bathrooms: 4,
        is_available: false,
    },
    DemoListing {
        identifier: "72905",
        name: "Cedar Mini Flat",
        description: "Self-contained one bedroom flat close to the university",
        price: 40_000,
        location: "Yaba",
        bedrooms: 1,
        bathrooms: 1,
        is_available: true,
    },
    DemoListing {
        identifier: "80366",
        name: "Ridgeview Detached House",
        description: "Five bedroom fully detached house with pool and cinema room",
        price: 240_000,
        location: "Banana Island",
        bedrooms: 5,
        bathrooms: 6,
        is_available: true,
    },
];

pub fn demo_listings() -> Vec<NewProperty> {
    DEMO_LISTINGS
        .iter()
        .map(|listing| NewProperty {
            name: listing.name.to_string(),
            description: listing.description.to_string(),
            price: Decimal::new(listing.price, 0),
            location: listing.location.to_string(),
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            is_available: listing.is_available,
            image: None,
            image_urls: None,
            property_identifier: Some(listing.identifier.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::demo_listings;

    #[test]
    fn demo_identifiers_are_unique_five_digit_numbers() {
        let listings = demo_listings();
        let identifiers: HashSet<String> =
            listings.iter().filter_map(|l| l.property_identifier.clone()).collect();

        assert_eq!(identifiers.len(), listings.len());
        assert!(identifiers.iter().all(|id| id.len() == 5 && id.chars().all(|c| c.is_ascii_digit())));
    }

    #[test]
    fn demo_set_includes_an_unavailable_listing() {
        assert!(demo_listings().iter().any(|l| !l.is_available));
    }
}
