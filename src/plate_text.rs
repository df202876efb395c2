//! OCR post-processing for Russian registration plates.

pub const MIN_TEXT_LEN: usize = 3;

/// Cyrillic glyphs OCR commonly emits in place of plate characters.
fn correct(c: char) -> char {
    match c {
        'И' | 'П' | 'Ш' => 'Н',
        'Л' => 'Е',
        'Ц' => '7',
        'Ч' | 'Я' => '9',
        'З' => '3',
        'Д' => '0',
        'Ы' => 'М',
        _ => c,
    }
}

/// Plates only use letters shared by both alphabets; store them as Latin.
fn latinize(c: char) -> char {
    match c {
        'А' => 'A',
        'В' => 'B',
        'Е' => 'E',
        'К' => 'K',
        'М' => 'M',
        'Н' => 'H',
        'О' => 'O',
        'Р' => 'P',
        'С' => 'C',
        'Т' => 'T',
        'У' => 'Y',
        'Х' => 'X',
        _ => c,
    }
}

/// Uppercases, strips separators and maps OCR confusions to canonical Latin
/// characters.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_alphanumeric())
        .map(correct)
        .map(latinize)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Letter,
    Digit,
}

fn classes(text: &str) -> Option<Vec<Class>> {
    text.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                Some(Class::Digit)
            } else if c.is_ascii_alphabetic() {
                Some(Class::Letter)
            } else {
                None
            }
        })
        .collect()
}

fn matches(classes: &[Class], layout: &[(Class, usize)], region: (usize, usize)) -> bool {
    let head: usize = layout.iter().map(|(_, n)| n).sum();
    let tail = match classes.len().checked_sub(head) {
        Some(tail) if tail >= region.0 && tail <= region.1 => tail,
        _ => return false,
    };

    let mut rest = classes;
    for &(class, n) in layout {
        let (group, next) = rest.split_at(n);
        if group.iter().any(|c| *c != class) {
            return false;
        }
        rest = next;
    }

    rest.len() == tail && rest.iter().all(|c| *c == Class::Digit)
}

/// Passenger car `A123BC77[7]` or trailer `AB1234 77[7]` layout.
pub fn complies_format(text: &str) -> bool {
    use Class::*;

    let classes = match classes(text) {
        Some(c) => c,
        None => return false,
    };

    matches(&classes, &[(Letter, 1), (Digit, 3), (Letter, 2)], (2, 3))
        || matches(&classes, &[(Letter, 2), (Digit, 4)], (2, 3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize(" a123-bc_77 "), "A123BC77");
    }

    #[test]
    fn normalize_maps_cyrillic() {
        assert_eq!(normalize("А123ВС77"), "A123BC77");
        assert_eq!(normalize("о777ох199"), "O777OX199");
    }

    #[test]
    fn normalize_applies_ocr_corrections() {
        // И -> Н -> H, Ч -> 9, З -> 3, Д -> 0
        assert_eq!(normalize("И12ЧЗД"), "H12930");
    }

    #[test]
    fn car_formats() {
        assert!(complies_format("A123BC77"));
        assert!(complies_format("A123BC777"));
        assert!(!complies_format("A123BC7"));
        assert!(!complies_format("A123BC7777"));
        assert!(!complies_format("1123BC77"));
        assert!(!complies_format("A12BBC77"));
    }

    #[test]
    fn trailer_formats() {
        assert!(complies_format("AB123477"));
        assert!(complies_format("AB1234177"));
        assert!(!complies_format("AB12C477"));
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(!complies_format("Ж123BC77"));
        assert!(!complies_format(""));
    }
}
