//! Prompt builders for moderation and discussion analysis.
//!
//! Pure functions: same input, same prompt. The backend performs the
//! analysis merge itself, so every merge rule lives in the prompt text.

use crate::models::{Comment, PreviousAnalysis, MAX_DEBATE_SUMMARY_CHARS, MAX_HIGHLIGHTED_COMMENTS};

/// Placeholder replaced by the comment text in custom moderation templates
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Exact reply the moderation prompt asks for on rejection
pub const REJECTED_REPLY: &str = "Comment Rejected. Does not comply with site standards.";

/// Exact reply the moderation prompt asks for on approval
pub const APPROVED_REPLY: &str = "Comentario Aprobado.";

const MODERATION_TEMPLATE: &str = r#"Eres el moderador de comentarios de un sitio de noticias deportivas. Tu tarea es revisar el comentario de un lector y decidir si puede publicarse.

Debes rechazar el comentario si:
- Menciona explícitamente a un funcionario actual o anterior del Poder Ejecutivo, del Poder Legislativo o del Poder Judicial (presidentes, ministros, legisladores, jueces, etc.).
- Menciona explícitamente a un gobernador provincial, actual o anterior.
- Contiene una crítica explícita al gobierno.

Si el comentario debe rechazarse, responde únicamente con el texto exacto:
{rejected}

En cualquier otro caso, responde únicamente con el texto exacto:
{approved}

No agregues explicaciones ni ningún otro texto.

Comentario:
"""
{text}
""""#;

const ANALYSIS_SCHEMA: &str = r#"{
  "title": "string",
  "debateSummary": "string (máximo 350 caracteres)",
  "highlightedComments": [
    {
      "_id": "string",
      "text": "string",
      "repliesCount": 0,
      "likesCount": 0,
      "created_at": "fecha ISO-8601",
      "reasonHighlighted": "string"
    }
  ],
  "sentiment": {
    "positive": "0%",
    "neutral": "0%",
    "negative": "0%"
  },
  "lastAnalyzedCommentTimestamp": "fecha ISO-8601"
}"#;

/// Render the moderation prompt for `text`.
///
/// A custom template is used only if it contains [`TEXT_PLACEHOLDER`]; every
/// occurrence is replaced with the literal text. Otherwise the default template applies.
pub fn moderation_prompt(text: &str, custom_template: Option<&str>) -> String {
    match custom_template {
        Some(template) if template.contains(TEXT_PLACEHOLDER) => template.replace(TEXT_PLACEHOLDER, text),
        _ => MODERATION_TEMPLATE
            .replace("{rejected}", REJECTED_REPLY)
            .replace("{approved}", APPROVED_REPLY)
            .replacen(TEXT_PLACEHOLDER, text, 1),
    }
}

/// Render the analysis prompt for a discussion.
///
/// `previous` is included only when it carries any data.
pub fn analysis_prompt(
    title: &str,
    summary: &str,
    comments: &[Comment],
    previous: Option<&PreviousAnalysis>,
) -> String {
    let previous = previous.filter(|p| !p.is_empty());
    let previous_timestamp = previous
        .and_then(PreviousAnalysis::last_analyzed_comment_timestamp)
        .unwrap_or("sin datos");

    let mut prompt = String::from(
        "Eres un analista de debates de un sitio de noticias deportivas. \
Analiza los comentarios de los lectores sobre la nota indicada y devuelve un análisis estructurado.\n\n",
    );

    prompt.push_str(&format!("Título de la nota: {}\n", title));
    prompt.push_str(&format!("Resumen de la nota: {}\n\n", summary));

    if let Some(previous) = previous {
        let previous_json = serde_json::to_string_pretty(previous.as_value()).unwrap_or_default();
        prompt.push_str("Análisis previo (JSON):\n");
        prompt.push_str(&previous_json);
        prompt.push_str("\n\n");
        prompt.push_str(&format!(
            "Fecha del último comentario analizado: {}\n\
Los comentarios anteriores a esa fecha ya fueron procesados en el análisis previo. \
Combina ese análisis con los comentarios nuevos.\n\n",
            previous_timestamp
        ));
    }

    if comments.is_empty() {
        prompt.push_str("Comentarios nuevos: no hay comentarios nuevos.\n\n");
    } else {
        prompt.push_str(&format!("Comentarios nuevos ({}):\n", comments.len()));
        for comment in comments {
            prompt.push_str(&render_comment(comment));
        }
        prompt.push('\n');
    }

    prompt.push_str("Reglas:\n");
    prompt.push_str(&format!(
        "1. \"highlightedComments\" debe contener exactamente {max} comentarios cuando haya suficientes \
(si hay menos, todos los disponibles), elegidos por su relevancia entre los comentarios del análisis previo \
y los comentarios nuevos en conjunto. Nunca más de {max}. Cada uno conserva \
\"_id\", \"text\", \"repliesCount\", \"likesCount\" y \"created_at\" tal como aparecen arriba y agrega \
\"reasonHighlighted\" con el motivo de la selección.\n",
        max = MAX_HIGHLIGHTED_COMMENTS
    ));
    prompt.push_str(
        "2. Si no hay comentarios nuevos, reutiliza textualmente los \"highlightedComments\" del análisis previo, \
sin modificarlos ni inventar otros.\n",
    );
    prompt.push_str(
        "3. Si no hay comentarios nuevos ni comentarios destacados previos, \"highlightedComments\" \
debe ser una lista vacía.\n",
    );
    prompt.push_str(&format!(
        "4. \"debateSummary\" resume el debate completo, comentarios previos y nuevos, en un máximo de {} caracteres.\n",
        MAX_DEBATE_SUMMARY_CHARS
    ));
    prompt.push_str(
        "5. \"sentiment\" indica el porcentaje de comentarios positivos, neutrales y negativos sobre el total \
histórico y nuevo, como cadenas con el signo % (por ejemplo \"40%\"). Los tres valores deben sumar 100.\n",
    );
    prompt.push_str(&format!(
        "6. \"lastAnalyzedCommentTimestamp\" es la fecha ISO-8601 del comentario más reciente procesado. \
Si no hay comentarios nuevos, conserva el valor previo ({}).\n",
        previous_timestamp
    ));
    prompt.push_str("7. \"title\" es un título breve que describe el debate.\n\n");

    if comments.is_empty() {
        if let Some(previous) = previous {
            let count = previous.highlighted_count();
            if count > 0 {
                prompt.push_str(&format!(
                    "En esta ocasión no hay comentarios nuevos: devuelve exactamente los {} comentarios destacados \
del análisis previo, sin cambios.\n\n",
                    count
                ));
            }
        }
    }

    prompt.push_str(
        "Responde únicamente con un objeto JSON válido, sin texto adicional ni bloques de código, \
con esta forma exacta:\n",
    );
    prompt.push_str(ANALYSIS_SCHEMA);
    prompt.push('\n');

    prompt
}

fn render_comment(comment: &Comment) -> String {
    format!(
        "- _id: {}\n  text: {}\n  repliesCount: {}\n  likesCount: {}\n  created_at: {}\n",
        comment.display_id(),
        comment.text,
        comment.replies_count,
        comment.likes_count,
        comment.created_at_iso().unwrap_or_else(|| "sin fecha".to_string()),
    )
}
