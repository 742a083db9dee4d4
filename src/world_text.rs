use crate::render::Rgba;

const RISE_PER_FRAME: f32 = 1.0;
const TEXT_DECAY: f32 = 0.02;

/// Score popups and status messages anchored in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatingText {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub life: f32,
    pub color: Rgba,
}

pub fn spawn(texts: &mut Vec<FloatingText>, x: f32, y: f32, text: impl Into<String>, color: Rgba) {
    texts.push(FloatingText {
        x,
        y,
        text: text.into(),
        life: 1.0,
        color,
    });
}

pub fn update(texts: &mut Vec<FloatingText>) {
    texts.retain_mut(|t| {
        t.y -= RISE_PER_FRAME;
        t.life -= TEXT_DECAY;
        t.life > 0.0
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_rises_and_fades_out() {
        let mut texts = Vec::new();
        spawn(&mut texts, 0.0, 100.0, "+50", Rgba::hex(0xEAB308));
        update(&mut texts);
        assert_eq!(texts[0].y, 99.0);
        assert!((texts[0].life - 0.98).abs() < 1e-5);

        for _ in 0..59 {
            update(&mut texts);
        }
        assert!(texts.is_empty());
    }
}
