//! Qualitative color palette for group traces

/// Plotly's default qualitative sequence
pub const QUALITATIVE: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Fixed slots for the goggle tints
const PINNED: [(&str, usize); 3] = [("Transparent", 0), ("Yellow", 9), ("Red", 1)];

/// Assign a color to every label
///
/// The goggle tints keep their fixed slots; other labels take the remaining
/// slots in order, wrapping when exhausted.
pub fn assign_colors(labels: &[&str]) -> Vec<&'static str> {
    let reserved: Vec<usize> = PINNED
        .iter()
        .filter(|(name, _)| labels.contains(name))
        .map(|&(_, slot)| slot)
        .collect();
    let mut free = (0..QUALITATIVE.len())
        .filter(|slot| !reserved.contains(slot))
        .cycle();

    labels
        .iter()
        .map(|label| {
            let slot = PINNED
                .iter()
                .find(|(name, _)| name == label)
                .map(|&(_, slot)| slot)
                .or_else(|| free.next())
                .unwrap_or(0);
            QUALITATIVE[slot]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goggle_tints_are_pinned() {
        let colors = assign_colors(&["Red", "Transparent", "Yellow"]);
        assert_eq!(colors, vec!["#EF553B", "#636EFA", "#FECB52"]);
    }

    #[test]
    fn test_other_labels_skip_pinned_slots() {
        let colors = assign_colors(&["Transparent", "Blue", "Green"]);
        assert_eq!(colors, vec!["#636EFA", "#EF553B", "#00CC96"]);

        let colors = assign_colors(&["Transparent", "Red", "Blue"]);
        assert_eq!(colors[2], "#00CC96");
    }

    #[test]
    fn test_wraps_after_ten_labels() {
        let labels: Vec<String> = (0..12).map(|i| format!("g{}", i)).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let colors = assign_colors(&refs);
        assert_eq!(colors[10], colors[0]);
    }
}
