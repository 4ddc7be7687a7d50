use crate::backend::DrawCall;
use crate::scene::Sprite;

/// Splits `sprites` into maximal runs of consecutive same-texture sprites.
///
/// One linear scan; no reordering. Callers that interleave textures get one call per switch.
pub fn compute_draw_calls(sprites: &[Sprite]) -> Vec<DrawCall> {
    let mut calls: Vec<DrawCall> = Vec::new();

    for (i, sprite) in sprites.iter().enumerate() {
        match calls.last_mut() {
            Some(run) if run.texture == sprite.texture => run.instance_count += 1,
            _ => calls.push(DrawCall {
                texture: sprite.texture.clone(),
                instance_offset: i as u32,
                instance_count: 1,
            }),
        }
    }

    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;

    fn sprites(textures: &[&str]) -> Vec<Sprite> {
        textures
            .iter()
            .map(|t| Sprite::new(*t, Vec2::ZERO, Vec2::new(1.0, 1.0)))
            .collect()
    }

    #[test]
    fn empty_input_has_no_calls() {
        assert!(compute_draw_calls(&[]).is_empty());
    }

    #[test]
    fn runs_are_maximal() {
        let calls = compute_draw_calls(&sprites(&["a", "a", "b", "b", "b", "a"]));
        let runs: Vec<_> = calls
            .iter()
            .map(|c| (c.texture.as_str(), c.instance_offset, c.instance_count))
            .collect();
        assert_eq!(runs, vec![("a", 0, 2), ("b", 2, 3), ("a", 5, 1)]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn calls_partition_the_sequence(textures in prop::collection::vec("[abc]", 0..64)) {
                let refs: Vec<&str> = textures.iter().map(String::as_str).collect();
                let calls = compute_draw_calls(&sprites(&refs));

                let total: u32 = calls.iter().map(|c| c.instance_count).sum();
                prop_assert_eq!(total as usize, textures.len());

                let mut next = 0u32;
                for c in &calls {
                    prop_assert_eq!(c.instance_offset, next);
                    prop_assert!(c.instance_count > 0);
                    for t in &refs[next as usize..(next + c.instance_count) as usize] {
                        prop_assert_eq!(*t, c.texture.as_str());
                    }
                    next += c.instance_count;
                }

                for pair in calls.windows(2) {
                    prop_assert_ne!(&pair[0].texture, &pair[1].texture);
                }
            }
        }
    }
}
