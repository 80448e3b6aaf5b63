/// The three exercises of the rehabilitation programme
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum ExerciseType {
    Walking,
    FistRaise,
    EyeGaze,
}

/// Display metadata shared by every screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub icon: &'static str,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 3] = [
        ExerciseType::Walking,
        ExerciseType::FistRaise,
        ExerciseType::EyeGaze,
    ];

    pub fn info(&self) -> ExerciseInfo {
        match self {
            ExerciseType::Walking => ExerciseInfo {
                name: "Slow walking",
                description: "Walk at a slow, steady pace",
                unit: "min",
                icon: "🚶",
            },
            ExerciseType::FistRaise => ExerciseInfo {
                name: "Fist raises",
                description: "Clasp both hands and raise them slowly from the stomach to eye level",
                unit: "sets",
                icon: "💪",
            },
            ExerciseType::EyeGaze => ExerciseInfo {
                name: "Eye-gaze training",
                description: "Move the eyes slowly from side to side while keeping the head still",
                unit: "reps",
                icon: "👀",
            },
        }
    }
}
