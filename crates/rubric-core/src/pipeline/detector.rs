//! Product/service detection.
//!
//! A pure marker-table heuristic over the item name and category hint —
//! no I/O, no AI. The outcome only biases the prompt rules; it never
//! vetoes the model's choice. `unknown` is the safe default.

use rubric_types::{Detection, ObjectType};

/// Markers that indicate a physical good. Stem forms: matched as
/// substrings of the lowercased name.
const PRODUCT_MARKERS: &[&str] = &[
    "кабел",
    "провод",
    "датчик",
    "преобразовател",
    "труб",
    "болт",
    "гайк",
    "шайб",
    "подшипник",
    "насос",
    "фильтр",
    "клапан",
    "вентил",
    "редуктор",
    "двигател",
    "трансформатор",
    "светильник",
    "ламп",
    "выключател",
    "розетк",
    "манометр",
    "термометр",
    "счетчик",
    "компрессор",
    "краск",
    "грунтовк",
    "бумаг",
    "перчатк",
    "каск",
    "гост ",
    " шт",
    " мм",
    " кг",
];

/// Markers that indicate a service.
const SERVICE_MARKERS: &[&str] = &[
    "услуг",
    "работ",
    "ремонт",
    "обслуживан",
    "монтаж",
    "демонтаж",
    "аренд",
    "поверк",
    "испытани",
    "диагностик",
    "проектирован",
    "разработк",
    "доставк",
    "перевозк",
    "обучени",
    "консультац",
    "страхован",
    "техосмотр",
];

/// The product/service detector.
pub struct ObjectTypeDetector;

impl ObjectTypeDetector {
    /// Create a detector.
    pub fn new() -> Self {
        Self
    }

    /// Detect whether an item is a product, a service, or unknown.
    ///
    /// Service markers outweigh product markers on a tie: names like
    /// "ремонт насоса" mention a good but describe a service.
    pub fn detect(&self, name: &str, category: Option<&str>) -> Detection {
        let haystack = match category {
            Some(cat) => format!("{} {}", name.to_lowercase(), cat.to_lowercase()),
            None => name.to_lowercase(),
        };

        let product_hits: Vec<&str> = PRODUCT_MARKERS
            .iter()
            .copied()
            .filter(|m| haystack.contains(m))
            .collect();
        let service_hits: Vec<&str> = SERVICE_MARKERS
            .iter()
            .copied()
            .filter(|m| haystack.contains(m))
            .collect();

        if product_hits.is_empty() && service_hits.is_empty() {
            return Detection::unknown();
        }

        let (object_type, hits) = if !service_hits.is_empty() && service_hits.len() >= product_hits.len() {
            (ObjectType::Service, service_hits)
        } else {
            (ObjectType::Product, product_hits)
        };

        let confidence = (0.5 + 0.1 * hits.len() as f64).min(0.9);
        Detection {
            object_type,
            confidence,
            reasoning: format!("markers: {}", hits.join(", ")),
        }
    }
}

impl Default for ObjectTypeDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_product() {
        let detector = ObjectTypeDetector::new();
        let detection = detector.detect("контрольный кабель КВВГ 4х1,5", None);
        assert_eq!(detection.object_type, ObjectType::Product);
        assert!(detection.confidence >= 0.5);
        assert!(detection.reasoning.contains("кабел"));
    }

    #[test]
    fn detects_service() {
        let detector = ObjectTypeDetector::new();
        let detection = detector.detect("услуги по поверке манометров", None);
        assert_eq!(detection.object_type, ObjectType::Service);
    }

    #[test]
    fn service_outweighs_product_on_tie() {
        let detector = ObjectTypeDetector::new();
        // One product marker (насос) and one service marker (ремонт).
        let detection = detector.detect("ремонт насоса", None);
        assert_eq!(detection.object_type, ObjectType::Service);
    }

    #[test]
    fn unknown_when_no_markers() {
        let detector = ObjectTypeDetector::new();
        let detection = detector.detect("изделие 47-Б", None);
        assert_eq!(detection.object_type, ObjectType::Unknown);
        assert_eq!(detection.confidence, 0.0);
    }

    #[test]
    fn category_hint_contributes() {
        let detector = ObjectTypeDetector::new();
        let detection = detector.detect("позиция 17", Some("Транспортные услуги"));
        assert_eq!(detection.object_type, ObjectType::Service);
    }

    #[test]
    fn confidence_grows_with_hits_and_caps() {
        let detector = ObjectTypeDetector::new();
        let one = detector.detect("болт", None);
        let many = detector.detect("болт гайка шайба подшипник клапан фильтр", None);
        assert!(many.confidence > one.confidence);
        assert!(many.confidence <= 0.9);
    }
}
