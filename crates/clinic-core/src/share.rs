//! # Prescription Sharing
//!
//! Builds the prescription message sent to the patient and the messaging
//! deep link that carries it. Opening the link is the shell's job.
//!
//! ## Message Layout
//! ```text
//! 🏥 *CITY CARE CLINIC*
//! 👨‍⚕️ Dr. Mehta
//! 📅 15 Mar 2026
//!
//! 👤 *Patient:* Rahul (24/M)
//! 📱 *Phone:* 9876543210
//! ----------------------------
//! 1. *Dolo 650* (Qty: 3)
//!    🕒 Morning (1 • After), Night (1 • After)
//! ----------------------------
//! 💰 *Total Bill:* ₹24
//!
//! _Get well soon!_ 🙏
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::settlement::compute_settlement;
use crate::types::{DispenseLine, DoseTiming, Patient};

const SEPARATOR: &str = "----------------------------";

/// Clinic identity printed in the message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicProfile {
    pub clinic_name: String,
    pub doctor_name: String,
    /// Prefixed to bare 10-digit numbers in the deep link, e.g. "91".
    pub country_code: String,
}

/// Where the deep link should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareTarget {
    /// Native app on a phone (`whatsapp://`).
    App,
    /// Browser on a desktop (`https://web.whatsapp.com`).
    Web,
}

/// "Rahul (24/M)" when the patient has a name, otherwise the phone.
pub fn patient_label(phone: &str, patient: Option<&Patient>) -> String {
    match patient {
        Some(p) if !p.name.trim().is_empty() => match p.age {
            Some(age) => format!("{} ({}/{})", p.name.trim(), age, p.gender.initial()),
            None => format!("{} ({})", p.name.trim(), p.gender.initial()),
        },
        _ => phone.to_string(),
    }
}

/// "Morning (1 • After), Night (1/2)" or "As advised" when empty.
pub fn timing_text(timings: &[DoseTiming]) -> String {
    if timings.is_empty() {
        return "As advised".to_string();
    }

    timings
        .iter()
        .map(|t| match t.food {
            Some(food) => format!("{} ({} • {})", t.slot.label(), t.dose, food.label()),
            None => format!("{} ({})", t.slot.label(), t.dose),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the full prescription message.
pub fn prescription_message(
    profile: &ClinicProfile,
    phone: &str,
    patient: Option<&Patient>,
    lines: &[DispenseLine],
    date: NaiveDate,
) -> String {
    let medicines = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                "{}. *{}* (Qty: {})\n   🕒 {}",
                i + 1,
                line.name,
                line.quantity,
                timing_text(&line.timings)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let total = compute_settlement(lines).bill_total;

    format!(
        "🏥 *{clinic}*\n👨‍⚕️ {doctor}\n📅 {date}\n\n👤 *Patient:* {patient}\n📱 *Phone:* {phone}\n{sep}\n{medicines}\n{sep}\n💰 *Total Bill:* {total}\n\n_Get well soon!_ 🙏",
        clinic = profile.clinic_name.to_uppercase(),
        doctor = profile.doctor_name,
        date = date.format("%-d %b %Y"),
        patient = patient_label(phone, patient),
        phone = phone,
        sep = SEPARATOR,
        medicines = medicines,
        total = total.display_compact(),
    )
}

/// Digits only, with the country code prefixed to bare 10-digit numbers.
pub fn whatsapp_phone(phone: &str, country_code: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("{country_code}{digits}")
    } else {
        digits
    }
}

/// Builds the deep link that opens a chat with `text` prefilled.
pub fn share_link(target: ShareTarget, phone: &str, country_code: &str, text: &str) -> String {
    let base = match target {
        ShareTarget::App => "whatsapp://send",
        ShareTarget::Web => "https://web.whatsapp.com/send",
    };
    format!(
        "{base}?phone={}&text={}",
        whatsapp_phone(phone, country_code),
        urlencoding::encode(text)
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DoseSlot, FoodInstruction, Gender};

    fn profile() -> ClinicProfile {
        ClinicProfile {
            clinic_name: "City Care Clinic".to_string(),
            doctor_name: "Dr. Mehta".to_string(),
            country_code: "91".to_string(),
        }
    }

    fn rahul() -> Patient {
        Patient {
            phone: "9876543210".to_string(),
            name: "Rahul".to_string(),
            age: Some(24),
            gender: Gender::Male,
            last_visit: None,
        }
    }

    #[test]
    fn test_patient_label() {
        assert_eq!(patient_label("9876543210", Some(&rahul())), "Rahul (24/M)");
        assert_eq!(patient_label("9876543210", None), "9876543210");

        let unnamed = Patient::anonymous("9876543210");
        assert_eq!(patient_label("9876543210", Some(&unnamed)), "9876543210");
    }

    #[test]
    fn test_timing_text() {
        assert_eq!(timing_text(&[]), "As advised");

        let timings = vec![
            DoseTiming::standard(DoseSlot::Morning),
            DoseTiming {
                slot: DoseSlot::Night,
                dose: "1/2".to_string(),
                food: None,
            },
        ];
        assert_eq!(timing_text(&timings), "Morning (1 • After), Night (1/2)");
    }

    #[test]
    fn test_message_layout() {
        let line = DispenseLine::new("m1", "Dolo 650", 3, 500, 800).with_timings(vec![
            DoseTiming {
                slot: DoseSlot::Morning,
                dose: "1".to_string(),
                food: Some(FoodInstruction::Before),
            },
        ]);
        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let text = prescription_message(&profile(), "9876543210", Some(&rahul()), &[line], date);

        assert!(text.starts_with("🏥 *CITY CARE CLINIC*\n👨‍⚕️ Dr. Mehta\n📅 15 Mar 2026\n"));
        assert!(text.contains("👤 *Patient:* Rahul (24/M)"));
        assert!(text.contains("1. *Dolo 650* (Qty: 3)\n   🕒 Morning (1 • Before)"));
        assert!(text.contains("💰 *Total Bill:* ₹24"));
        assert!(text.ends_with("_Get well soon!_ 🙏"));
    }

    #[test]
    fn test_whatsapp_phone() {
        assert_eq!(whatsapp_phone("98765 43210", "91"), "919876543210");
        assert_eq!(whatsapp_phone("+91 98765 43210", "91"), "919876543210");
        assert_eq!(whatsapp_phone("12345", "91"), "12345");
    }

    #[test]
    fn test_share_link() {
        let app = share_link(ShareTarget::App, "9876543210", "91", "Hi there");
        assert_eq!(app, "whatsapp://send?phone=919876543210&text=Hi%20there");

        let web = share_link(ShareTarget::Web, "9876543210", "91", "a&b");
        assert_eq!(
            web,
            "https://web.whatsapp.com/send?phone=919876543210&text=a%26b"
        );
    }
}
