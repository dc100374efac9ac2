//! Static per-language template tables for summary generation.
//!
//! Two languages, one record each — a plain mapping from language code to
//! strings, no formatting engine.

use stillontime_core::types::Language;

/// Localized labels and messages used by the text/HTML generators.
#[derive(Debug, Clone, Copy)]
pub struct Templates {
    pub title: &'static str,
    pub call_time: &'static str,
    pub location: &'static str,
    pub scene_int: &'static str,
    pub scene_ext: &'static str,
    pub scenes: &'static str,
    pub timeline: &'static str,
    pub wake_up: &'static str,
    pub departure: &'static str,
    pub arrival: &'static str,
    pub estimated_wrap: &'static str,
    pub route: &'static str,
    pub total_travel: &'static str,
    pub contacts: &'static str,
    pub equipment: &'static str,
    pub safety_notes: &'static str,
    pub safety_notes_body: &'static str,
    pub weather: &'static str,
    pub warnings: &'static str,
    pub early_wake_warning: &'static str,
    pub long_travel_warning: &'static str,
    pub cold_ext_warning: &'static str,
    pub heat_ext_warning: &'static str,
    pub minutes: &'static str,
}

const PL: Templates = Templates {
    title: "Plan dnia zdjęciowego",
    call_time: "Godzina zbiórki",
    location: "Lokacja",
    scene_int: "wnętrze",
    scene_ext: "plener",
    scenes: "Sceny",
    timeline: "Harmonogram",
    wake_up: "Pobudka",
    departure: "Wyjazd",
    arrival: "Przyjazd na plan",
    estimated_wrap: "Szacowany koniec zdjęć",
    route: "Trasa",
    total_travel: "Łączny czas dojazdu",
    contacts: "Kontakty",
    equipment: "Sprzęt",
    safety_notes: "Uwagi BHP",
    safety_notes_body: "Sprawdź zabezpieczenia planu i drogi ewakuacyjne przed rozpoczęciem pracy.",
    weather: "Pogoda",
    warnings: "Ostrzeżenia",
    early_wake_warning: "Bardzo wczesna pobudka przed 04:00",
    long_travel_warning: "Dojazd przekracza 2 godziny",
    cold_ext_warning: "Zdjęcia w plenerze przy temperaturze poniżej 0°C",
    heat_ext_warning: "Zdjęcia w plenerze przy temperaturze powyżej 30°C",
    minutes: "min",
};

const EN: Templates = Templates {
    title: "Shooting day summary",
    call_time: "Call time",
    location: "Location",
    scene_int: "interior",
    scene_ext: "exterior",
    scenes: "Scenes",
    timeline: "Timeline",
    wake_up: "Wake up",
    departure: "Departure",
    arrival: "Arrival on set",
    estimated_wrap: "Estimated wrap",
    route: "Route",
    total_travel: "Total travel time",
    contacts: "Contacts",
    equipment: "Equipment",
    safety_notes: "Safety notes",
    safety_notes_body: "Check set safety measures and evacuation routes before work starts.",
    weather: "Weather",
    warnings: "Warnings",
    early_wake_warning: "Very early wake-up before 04:00",
    long_travel_warning: "Travel time exceeds 2 hours",
    cold_ext_warning: "Exterior shoot below 0°C",
    heat_ext_warning: "Exterior shoot above 30°C",
    minutes: "min",
};

impl Templates {
    /// Select the template table for a language.
    pub fn for_language(language: Language) -> &'static Templates {
        match language {
            Language::Pl => &PL,
            Language::En => &EN,
        }
    }
}
