use crate::{error::AppResult, repository::SlugStore};

/// SlugTable
///
/// The slugged collections. Each owns an independent slug namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlugTable {
    Hospitals,
    Specialties,
    Doctors,
    Treatments,
}

impl SlugTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            SlugTable::Hospitals => "hospitals",
            SlugTable::Specialties => "specialties",
            SlugTable::Doctors => "doctors",
            SlugTable::Treatments => "treatments",
        }
    }

    /// Used when a name contains nothing sluggable.
    fn fallback(&self) -> &'static str {
        match self {
            SlugTable::Hospitals => "hospital",
            SlugTable::Specialties => "specialty",
            SlugTable::Doctors => "doctor",
            SlugTable::Treatments => "treatment",
        }
    }
}

fn fold(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'æ' => "ae",
        'Æ' => "AE",
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'ď' | 'đ' => "d",
        'Ď' | 'Đ' => "D",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => "E",
        'ğ' => "g",
        'Ğ' => "G",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'İ' => "I",
        'ł' => "l",
        'Ł' => "L",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ő' => "O",
        'œ' => "oe",
        'Œ' => "OE",
        'ř' => "r",
        'Ř' => "R",
        'ś' | 'š' | 'ş' => "s",
        'Ś' | 'Š' | 'Ş' => "S",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'Ť' | 'Ţ' => "T",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        '&' => " and ",
        _ => return None,
    };
    Some(folded)
}

/// normalize
///
/// Deterministic text-to-slug conversion: diacritics folded to ASCII, `&` spelled out,
/// hyphens treated as whitespace, every other symbol dropped, whitespace runs joined
/// with a single `-`, lowercased.
///
/// `"Cardiology & Heart-Surgery"` becomes `"cardiology-and-heart-surgery"`.
pub fn normalize(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some(folded) = fold(c) {
            cleaned.push_str(folded);
        } else if c == '-' || c.is_whitespace() {
            cleaned.push(' ');
        } else if c.is_ascii_alphanumeric() {
            cleaned.push(c);
        }
    }

    cleaned
        .split_whitespace()
        .map(|word| word.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// resolve_unique
///
/// Tries `base`, `base-1`, `base-2`, … against `table` one candidate at a time and
/// returns the first free one. `exclude_id` names the row being renamed so it does not
/// collide with itself.
///
/// A concurrent writer can still claim the returned slug before it is inserted; the
/// Postgres store catches that through the unique index and resolves again.
pub async fn resolve_unique<S>(
    store: &S,
    table: SlugTable,
    text: &str,
    exclude_id: Option<i32>,
) -> AppResult<String>
where
    S: SlugStore + ?Sized,
{
    let mut base = normalize(text);
    if base.is_empty() {
        base = table.fallback().to_string();
    }

    let mut candidate = base.clone();
    let mut counter = 1;
    while store.slug_taken(table, &candidate, exclude_id).await? {
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }

    Ok(candidate)
}

