use serenity::{
    builder::{CreateActionRow, CreateButton},
    model::application::ButtonStyle,
};

const PREFIX: &str = "music:";

/// Playback controls offered as buttons under the now-playing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pause,
    Resume,
    Skip,
    Shuffle,
    Stop,
}

impl Control {
    const ALL: [Control; 5] = [
        Control::Pause,
        Control::Resume,
        Control::Skip,
        Control::Shuffle,
        Control::Stop,
    ];

    fn name(self) -> &'static str {
        match self {
            Control::Pause => "pause",
            Control::Resume => "resume",
            Control::Skip => "skip",
            Control::Shuffle => "shuffle",
            Control::Stop => "stop",
        }
    }

    pub fn custom_id(self) -> String {
        format!("{}{}", PREFIX, self.name())
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        let name = id.strip_prefix(PREFIX)?;
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// Slash commands share their names with the buttons.
    pub fn from_command(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    fn button(self) -> CreateButton {
        let (label, emoji, style) = match self {
            Control::Pause => ("Pause", '⏸', ButtonStyle::Secondary),
            Control::Resume => ("Resume", '▶', ButtonStyle::Secondary),
            Control::Skip => ("Skip", '⏭', ButtonStyle::Primary),
            Control::Shuffle => ("Shuffle", '🔀', ButtonStyle::Secondary),
            Control::Stop => ("Stop", '⏹', ButtonStyle::Danger),
        };
        CreateButton::new(self.custom_id())
            .label(label)
            .emoji(emoji)
            .style(style)
    }
}

pub fn buttons() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(
        Control::ALL.iter().map(|c| c.button()).collect(),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_ids_parse_back() {
        for control in Control::ALL {
            assert_eq!(Control::from_custom_id(&control.custom_id()), Some(control));
        }
    }

    #[test]
    fn foreign_ids_are_ignored() {
        assert_eq!(Control::from_custom_id("pause"), None);
        assert_eq!(Control::from_custom_id("music:rewind"), None);
        assert_eq!(Control::from_custom_id("giveaway:pause"), None);
    }

    #[test]
    fn command_names_match_controls() {
        assert_eq!(Control::from_command("skip"), Some(Control::Skip));
        assert_eq!(Control::from_command("play"), None);
    }
}
