pub mod simon;
pub mod sound;
pub mod term;
pub mod trivia;

pub struct GameDescriptor
{
    pub name: &'static str,
    pub description: &'static str,
}

pub fn registry() -> Vec<GameDescriptor>
{
    vec![GameDescriptor {
        name: "simon",
        description: "Repeat a growing colour pattern",
    },
    GameDescriptor {
        name: "trivia",
        description: "Timed multiple-choice quiz from the Open Trivia Database",
    }]
}
