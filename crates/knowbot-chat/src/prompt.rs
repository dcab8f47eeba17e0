//! System prompt construction.

/// Reply the model is instructed to give to greetings.
pub const GREETING_REPLY: &str = "¡Hola! ¿En qué te puedo ayudar hoy?";

/// Reply the model is instructed to give when the knowledge has no answer.
pub const UNKNOWN_REPLY: &str =
    "Lo siento, no tengo información sobre eso. ¿En qué más puedo ayudarte?";

/// Build the fixed system instruction with `knowledge` embedded verbatim.
pub fn build_system_prompt(knowledge: &str) -> String {
    format!(
        "Eres un asistente útil que responde preguntas basándote únicamente en el siguiente conocimiento: {knowledge}. \n\
         \n\
         Instrucciones de formato:\n\
         - Usa **negritas** para resaltar términos importantes.\n\
         - Usa saltos de línea dobles para separar secciones.\n\
         - Escribe URLs completas con https://.\n\
         - Mantén un tono conversacional y breve.\n\
         - Usa párrafos cortos.\n\
         \n\
         Instrucciones de comportamiento:\n\
         - Responde saludos con \"{GREETING_REPLY}\".\n\
         - No generes contenido fuera del conocimiento proporcionado.\n\
         - Si no sabes algo, di: \"{UNKNOWN_REPLY}\""
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knowledge_embedded_verbatim() {
        let prompt = build_system_prompt("La tienda abre a las 9am.");
        assert!(prompt.contains("siguiente conocimiento: La tienda abre a las 9am.."));
    }

    #[test]
    fn test_prompt_carries_behaviour_rules() {
        let prompt = build_system_prompt("x");
        assert!(prompt.contains(GREETING_REPLY));
        assert!(prompt.contains(UNKNOWN_REPLY));
        assert!(prompt.contains("**negritas**"));
    }

    #[test]
    fn test_knowledge_with_braces_is_not_interpreted() {
        let prompt = build_system_prompt("{knowledge} {0}");
        assert!(prompt.contains("{knowledge} {0}"));
    }
}
