//! Markup extractors for the booking flow pages.
//!
//! All extractors are total: a missing control, marker or form yields an empty
//! result, which ends up as empty fields in the report row.

use crate::Film;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Film selector control, most specific first.
const FILM_CONTROL_SELECTORS: [&str; 2] = ["#film", "[name=\"film\"]"];
const BOOKING_FORM_SELECTOR: &str = "form#form_reservation";

/// Image attributes inspected for a room marker, in order.
const ROOM_MARKER_ATTRS: [&str; 4] = ["src", "class", "alt", "title"];

/// Room a screening was assigned to. Both fields empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomInfo {
    pub number: String,
    pub label: String,
}

impl RoomInfo {
    fn numbered(n: u32) -> Self {
        Self {
            number: format!("{n:02}"),
            label: format!("Room {n}"),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.number.is_empty() && self.label.is_empty()
    }
}

enum RoomKind {
    /// First capture group holds the room number.
    Numbered,
    /// Fixed room category without a number.
    Named {
        token: &'static str,
        label: &'static str,
    },
}

struct RoomRule {
    name: &'static str,
    pattern: Regex,
    kind: RoomKind,
}

impl RoomRule {
    fn new(name: &'static str, pattern: &str, kind: RoomKind) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("room marker pattern"),
            kind,
        }
    }

    fn apply(&self, text: &str) -> Option<RoomInfo> {
        let caps = self.pattern.captures(text)?;
        match &self.kind {
            RoomKind::Numbered => {
                let n = caps.get(1)?.as_str().parse::<u32>().ok()?;
                Some(RoomInfo::numbered(n))
            }
            RoomKind::Named { token, label } => Some(RoomInfo {
                number: token.to_string(),
                label: label.to_string(),
            }),
        }
    }
}

// Order matters: numbered markers win over the named category.
static ROOM_RULES: LazyLock<Vec<RoomRule>> = LazyLock::new(|| {
    vec![
        RoomRule::new(
            "filename",
            r"(?i)sal_(\d{1,2})\.(?:png|jpe?g|gif|svg|webp)",
            RoomKind::Numbered,
        ),
        RoomRule::new("class", r"(?:^|\s)tag-SAL(\d{1,2})(?:\s|$)", RoomKind::Numbered),
        RoomRule::new(
            "category",
            r"(?:^|\s)tag-IMAX(?:\s|$)",
            RoomKind::Named {
                token: "IMAX",
                label: "IMAX",
            },
        ),
    ]
});

/// Films offered by the film selector of the booking entry page.
pub fn extract_films(html: &str) -> Vec<Film> {
    let document = Html::parse_document(html);
    let Ok(option_sel) = Selector::parse("option") else {
        return Vec::new();
    };

    let control = FILM_CONTROL_SELECTORS.iter().find_map(|css| {
        let sel = Selector::parse(css).ok()?;
        document.select(&sel).next()
    });
    let Some(control) = control else {
        return Vec::new();
    };

    control
        .select(&option_sel)
        .filter_map(|option| {
            let id = option.value().attr("value")?.trim();
            if id.is_empty() {
                return None;
            }
            Some(Film {
                id: id.to_string(),
                title: option.text().collect::<String>().trim().to_string(),
            })
        })
        .collect()
}

/// Room disclosed by the booking continuation page.
pub fn extract_room(html: &str) -> RoomInfo {
    let document = Html::parse_document(html);
    let Ok(img_sel) = Selector::parse("img") else {
        return RoomInfo::default();
    };
    let images: Vec<ElementRef> = document.select(&img_sel).collect();

    for rule in ROOM_RULES.iter() {
        for img in &images {
            for attr in ROOM_MARKER_ATTRS {
                if let Some(value) = img.value().attr(attr)
                    && let Some(room) = rule.apply(value)
                {
                    tracing::trace!(rule = rule.name, attr, "room marker matched");
                    return room;
                }
            }
        }
    }

    RoomInfo::default()
}

/// Action target of the booking form, or an empty string.
pub fn extract_reservation_link(html: &str) -> String {
    let document = Html::parse_document(html);
    if let Ok(form_sel) = Selector::parse(BOOKING_FORM_SELECTOR)
        && let Some(form) = document.select(&form_sel).next()
        && let Some(action) = form.value().attr("action")
    {
        return action.trim().to_string();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn films_come_from_the_id_control_in_document_order() {
        let html = r#"
            <select id="film">
                <option value="">Choose a film</option>
                <option value=" 67890 "> Elio </option>
                <option value="12345">Jurassic World</option>
            </select>"#;
        let films = extract_films(html);
        assert_eq!(
            films,
            vec![
                Film {
                    id: "67890".into(),
                    title: "Elio".into()
                },
                Film {
                    id: "12345".into(),
                    title: "Jurassic World".into()
                },
            ]
        );
    }

    #[test]
    fn films_fall_back_to_the_named_control() {
        let html = r#"<form><select name="film"><option value="7">Nosferatu</option></select></form>"#;
        let films = extract_films(html);
        assert_eq!(films.len(), 1);
        assert_eq!(films[0].id, "7");
    }

    #[test]
    fn id_control_wins_over_named_control() {
        let html = r#"
            <select name="film"><option value="1">Named</option></select>
            <select id="film"><option value="2">By id</option></select>"#;
        let films = extract_films(html);
        assert_eq!(films.len(), 1);
        assert_eq!(films[0].title, "By id");
    }

    #[test]
    fn no_control_means_no_films() {
        assert!(extract_films("<p>Maintenance</p>").is_empty());
    }

    #[test]
    fn room_from_image_filename() {
        let room = extract_room(r#"<div><img src="/img/salles/sal_06.png" alt=""></div>"#);
        assert_eq!(room.number, "06");
        assert_eq!(room.label, "Room 6");
    }

    #[test]
    fn room_from_class_token() {
        let room = extract_room(r#"<img class="tag tag-SAL10" src="/img/blank.gif">"#);
        assert_eq!(room.number, "10");
        assert_eq!(room.label, "Room 10");
    }

    #[test]
    fn room_from_alt_text() {
        let room = extract_room(r#"<img src="/x.gif" alt="sal_3.jpg">"#);
        assert_eq!(room, RoomInfo::numbered(3));
    }

    #[test]
    fn named_category_room() {
        let room = extract_room(r#"<img class="tag tag-IMAX" src="/img/imax.png">"#);
        assert_eq!(room.number, "IMAX");
        assert_eq!(room.label, "IMAX");
    }

    #[test]
    fn numbered_marker_beats_category_on_a_later_image() {
        let html = r#"
            <img class="tag-IMAX" src="/img/logo.png">
            <img src="/img/sal_02.png">"#;
        assert_eq!(extract_room(html).number, "02");
    }

    #[test]
    fn filename_on_a_later_image_beats_class_token() {
        let html = r#"<img class="tag-SAL03"><img src="sal_05.png">"#;
        let room = extract_room(html);
        assert_eq!(room.number, "05");
        assert_eq!(room.label, "Room 5");
    }

    #[test]
    fn src_is_read_before_alt_on_the_same_image() {
        let room = extract_room(r#"<img alt="sal_09.png" src="sal_01.png">"#);
        assert_eq!(room.number, "01");
    }

    #[test]
    fn title_is_the_last_attribute_read() {
        let room = extract_room(r#"<img src="/img/blank.gif" title="sal_08.png">"#);
        assert_eq!(room, RoomInfo::numbered(8));
    }

    #[test]
    fn filename_in_alt_beats_class_token_in_title() {
        let room = extract_room(r#"<img title="tag-SAL7" alt="sal_04.png">"#);
        assert_eq!(room.number, "04");
        assert_eq!(room.label, "Room 4");
    }

    #[test]
    fn unknown_room_is_empty_not_an_error() {
        let room = extract_room(r#"<img src="/img/logo.png" class="brand">"#);
        assert!(room.is_unknown());
        assert!(extract_room("").is_unknown());
    }

    #[test]
    fn reservation_link_is_the_form_action() {
        let html = r#"<form id="form_reservation" action=" /reservation/paiement?id=9 " method="post"></form>"#;
        assert_eq!(extract_reservation_link(html), "/reservation/paiement?id=9");
        assert_eq!(extract_reservation_link("<form action='/other'></form>"), "");
    }
}
