/// Static discussion shown after the narrative
pub const DISCUSSION: &str = r#"### 1. What are fade-in and fade-out for in audio production?
A *fade-in* brings a sound up gradually and a *fade-out* takes it away gradually, so the transition is smooth. They are used to:
- avoid sudden sounds that startle the listener;
- add an emotional or dramatic feel;
- move between tracks so the change sounds natural.

### 2. How does changing the speed affect sound quality?
Changing the speed changes both the length and the character of the sound:
- slowed down, it sounds heavier and longer;
- sped up, it sounds shorter and higher.

When the pitch is kept with *time-stretching* the quality stays good, though digital artifacts can appear.

### 3. When should time-stretch be used instead of pitch-shift?
- Use *time-stretch* to change the duration without changing the pitch.
- Use *pitch-shift* to change the pitch without changing the duration.

For example:
- syncing rhythm: *time-stretch*
- adjusting harmony: *pitch-shift*

### 4. Does the duration change after the audio is sped up? Explain.
Yes, the duration changes.
- Sped up (1.5x), the audio gets shorter.
- Slowed down (0.75x), the audio gets longer.

With *time-stretching* (pitch untouched) the duration changes while the notes stay the same.

### 5. How does a fade differ between MP3 and WAV?
The fade works on both, but:
- **MP3**: lossy compression, so the fade can lose detail to compression artifacts.
- **WAV**: sounds more natural and suits further editing.
"#;
