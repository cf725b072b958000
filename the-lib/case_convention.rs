use unicode_general_category::{
  GeneralCategory,
  get_general_category,
};

/// `\p{L}`
fn is_letter(c: char) -> bool {
  matches!(
    get_general_category(c),
    GeneralCategory::UppercaseLetter
      | GeneralCategory::LowercaseLetter
      | GeneralCategory::TitlecaseLetter
      | GeneralCategory::ModifierLetter
      | GeneralCategory::OtherLetter
  )
}

/// `\p{M}`
fn is_mark(c: char) -> bool {
  matches!(
    get_general_category(c),
    GeneralCategory::NonspacingMark | GeneralCategory::SpacingMark | GeneralCategory::EnclosingMark
  )
}

pub fn to_upper_case(text: &str) -> String {
  let mut res = String::with_capacity(text.len());
  to_upper_case_with(text.chars(), &mut res);
  res
}

pub fn to_upper_case_with(text: impl Iterator<Item = char>, buf: &mut String) {
  text.for_each(|c| buf.extend(c.to_uppercase()));
}

pub fn to_lower_case(text: &str) -> String {
  let mut res = String::with_capacity(text.len());
  to_lower_case_with(text.chars(), &mut res);
  res
}

pub fn to_lower_case_with(text: impl Iterator<Item = char>, buf: &mut String) {
  text.for_each(|c| buf.extend(c.to_lowercase()));
}

/// Capitalizes every word, lowering the rest of it.
///
/// A word starts at a letter and continues over letters and combining
/// marks, so digits, apostrophes and hyphens start a new word.
pub fn to_title_case(text: &str) -> String {
  let mut res = String::with_capacity(text.len());
  to_title_case_with(text.chars(), &mut res);
  res
}

pub fn to_title_case_with(text: impl Iterator<Item = char>, buf: &mut String) {
  text.fold(false, |in_word, c| {
    if in_word && (is_letter(c) || is_mark(c)) {
      buf.extend(c.to_lowercase());
      true
    } else if is_letter(c) {
      buf.extend(c.to_uppercase());
      true
    } else {
      buf.push(c);
      false
    }
  });
}

/// Lowers the whole text, then capitalizes its first letter.
pub fn to_sentence_case(text: &str) -> String {
  let mut res = String::with_capacity(text.len());
  to_sentence_case_with(text.chars(), &mut res);
  res
}

pub fn to_sentence_case_with(text: impl Iterator<Item = char>, buf: &mut String) {
  text.fold(false, |seen_letter, c| {
    if !seen_letter && is_letter(c) {
      buf.extend(c.to_uppercase());
      true
    } else {
      buf.extend(c.to_lowercase());
      seen_letter
    }
  });
}
